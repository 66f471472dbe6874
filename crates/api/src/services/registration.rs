use tracing::{error, info, warn};

use relay_core::channel::extract_channel_name;
use relay_core::error::{RelayError, RelayResult};
use relay_db::models::{Channel, Subscription};
use relay_db::{DynStore, NewSubscription};
use relay_huginn::{AutomationError, ChannelMeta, DynAutomation, DynChannelProbe, ProbeError};

use super::store_err;

/// Registration and teardown of channels and subscriptions, including the
/// provisioning of the external poller/forwarder agent pair.
pub struct RegistrationWorkflow {
    store: DynStore,
    automation: DynAutomation,
    probe: Option<DynChannelProbe>,
}

impl RegistrationWorkflow {
    pub fn new(store: DynStore, automation: DynAutomation, probe: Option<DynChannelProbe>) -> Self {
        Self {
            store,
            automation,
            probe,
        }
    }

    pub async fn create_subscription(
        &self,
        channel_url: &str,
        callback_url: &str,
    ) -> RelayResult<Subscription> {
        let channel_name = extract_channel_name(channel_url).ok_or_else(|| {
            RelayError::Validation(format!("invalid channel URL: {channel_url}"))
        })?;

        // Probe before any state is written: an unreachable or private
        // channel must not leave a channel row or agents behind.
        let meta = match &self.probe {
            Some(probe) => match probe.probe(&channel_name).await {
                Ok(meta) => meta,
                Err(ProbeError::Transport(err)) => {
                    return Err(RelayError::Internal(anyhow::Error::new(err)))
                }
                Err(err) => {
                    return Err(RelayError::Validation(format!(
                        "channel {channel_name} rejected: {err}"
                    )))
                }
            },
            None => ChannelMeta::default(),
        };

        let channel = match self
            .store
            .find_channel_by_name(&channel_name)
            .await
            .map_err(store_err)?
        {
            Some(channel) => channel,
            None => self.provision_channel(&channel_name).await?,
        };

        if let Some(mut existing) = self
            .store
            .find_subscription(channel.id, callback_url)
            .await
            .map_err(store_err)?
        {
            if existing.is_active {
                return Err(RelayError::Conflict(format!(
                    "subscription for {channel_name} and {callback_url} already exists"
                )));
            }
            info!(subscription_id = existing.id, "reactivating subscription");
            existing.is_active = true;
            return self
                .store
                .update_subscription(&existing)
                .await
                .map_err(store_err);
        }

        self.store
            .create_subscription(NewSubscription {
                channel_id: channel.id,
                callback_url: callback_url.to_string(),
                title: meta.title,
                photo_url: meta.photo_url,
            })
            .await
            .map_err(store_err)
    }

    pub async fn delete_subscription(&self, subscription_id: i64) -> RelayResult<()> {
        let subscription = self
            .store
            .find_subscription_by_id(subscription_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| {
                RelayError::NotFound(format!("subscription {subscription_id} not found"))
            })?;
        let channel = self
            .store
            .find_channel_by_id(subscription.channel_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| {
                RelayError::NotFound(format!(
                    "channel {} not found for subscription",
                    subscription.channel_id
                ))
            })?;

        // Count-then-teardown races with a concurrent registration on the
        // same channel; the unique constraints keep the rows consistent, but
        // a channel torn down here may be re-provisioned a moment later.
        let active = self
            .store
            .find_active_subscriptions(channel.id)
            .await
            .map_err(store_err)?;

        if subscription.is_active && active.len() <= 1 {
            info!(
                channel_id = channel.id,
                channel_name = %channel.channel_name,
                "last active subscription removed, tearing down channel"
            );
            self.deprovision_tolerant(&channel).await;
            if let Err(err) = self.store.delete_channel(channel.id).await {
                warn!(channel_id = channel.id, %err, "failed to delete channel");
            }
        }

        self.store
            .delete_subscription(subscription.id)
            .await
            .map_err(store_err)
    }

    /// Unconditional channel teardown. Unlike subscription removal, a failed
    /// agent deletion aborts here so the operator sees the orphaned agent.
    pub async fn delete_channel(&self, channel_id: i64) -> RelayResult<()> {
        let channel = self
            .store
            .find_channel_by_id(channel_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| RelayError::NotFound(format!("channel {channel_id} not found")))?;

        for agent_id in [channel.poller_agent_id, channel.forwarder_agent_id]
            .into_iter()
            .flatten()
        {
            self.automation
                .delete_agent(agent_id)
                .await
                .map_err(|err| RelayError::Provisioning(err.to_string()))?;
        }

        self.store.delete_channel(channel.id).await.map_err(store_err)
    }

    /// Creates the channel row and its agent pair. Any failed step deletes
    /// whatever was created so far and surfaces the original cause.
    async fn provision_channel(&self, channel_name: &str) -> RelayResult<Channel> {
        let mut channel = self
            .store
            .create_channel(channel_name)
            .await
            .map_err(store_err)?;
        info!(channel_id = channel.id, %channel_name, "created channel, provisioning agents");

        let poller = match self.automation.create_poller_agent(channel_name).await {
            Ok(id) => id,
            Err(err) => return self.rollback(channel, &[], err).await,
        };
        let forwarder = match self.automation.create_forwarder_agent(channel_name).await {
            Ok(id) => id,
            Err(err) => return self.rollback(channel, &[poller], err).await,
        };
        if let Err(err) = self.automation.link_agents(poller, forwarder).await {
            return self.rollback(channel, &[poller, forwarder], err).await;
        }
        if let Err(err) = self.automation.start_agent(poller).await {
            return self.rollback(channel, &[poller, forwarder], err).await;
        }

        channel.is_monitored = true;
        channel.poller_agent_id = Some(poller);
        channel.forwarder_agent_id = Some(forwarder);
        self.store.update_channel(&channel).await.map_err(store_err)
    }

    /// Compensating cleanup for a half-provisioned channel. Cleanup failures
    /// are logged but never mask the original cause.
    async fn rollback(
        &self,
        channel: Channel,
        agent_ids: &[i64],
        cause: AutomationError,
    ) -> RelayResult<Channel> {
        error!(channel_id = channel.id, %cause, "provisioning failed, rolling back");
        for &agent_id in agent_ids {
            if let Err(err) = self.automation.delete_agent(agent_id).await {
                warn!(agent_id, %err, "failed to delete agent during rollback");
            }
        }
        if let Err(err) = self.store.delete_channel(channel.id).await {
            warn!(channel_id = channel.id, %err, "failed to delete channel during rollback");
        }
        Err(RelayError::Provisioning(cause.to_string()))
    }

    async fn deprovision_tolerant(&self, channel: &Channel) {
        for agent_id in [channel.poller_agent_id, channel.forwarder_agent_id]
            .into_iter()
            .flatten()
        {
            if let Err(err) = self.automation.delete_agent(agent_id).await {
                warn!(agent_id, %err, "failed to deprovision agent");
            }
        }
    }
}
