use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::models::{Channel, Subscription};
use crate::store::{NewSubscription, Store, StoreError};

/// In-memory `Store` for tests. Enforces the same uniqueness constraints as
/// the Postgres schema, including the cascade delete of subscriptions.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    channels: Vec<Channel>,
    subscriptions: Vec<Subscription>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_channel_by_name(&self, name: &str) -> Result<Option<Channel>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.channels.iter().find(|c| c.channel_name == name).cloned())
    }

    async fn find_channel_by_id(&self, id: i64) -> Result<Option<Channel>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.channels.iter().find(|c| c.id == id).cloned())
    }

    async fn create_channel(&self, channel_name: &str) -> Result<Channel, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        if inner.channels.iter().any(|c| c.channel_name == channel_name) {
            return Err(StoreError::Conflict(format!(
                "duplicate channel_name {channel_name}"
            )));
        }
        let channel = Channel {
            id: inner.next_id(),
            channel_name: channel_name.to_string(),
            is_monitored: false,
            poller_agent_id: None,
            forwarder_agent_id: None,
            created_at: Utc::now(),
        };
        inner.channels.push(channel.clone());
        Ok(channel)
    }

    async fn update_channel(&self, channel: &Channel) -> Result<Channel, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let slot = inner
            .channels
            .iter_mut()
            .find(|c| c.id == channel.id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        *slot = channel.clone();
        Ok(channel.clone())
    }

    async fn delete_channel(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        inner.channels.retain(|c| c.id != id);
        inner.subscriptions.retain(|s| s.channel_id != id);
        Ok(())
    }

    async fn find_active_subscriptions(
        &self,
        channel_id: i64,
    ) -> Result<Vec<Subscription>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner
            .subscriptions
            .iter()
            .filter(|s| s.channel_id == channel_id && s.is_active)
            .cloned()
            .collect())
    }

    async fn find_subscription(
        &self,
        channel_id: i64,
        callback_url: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner
            .subscriptions
            .iter()
            .find(|s| s.channel_id == channel_id && s.callback_url == callback_url)
            .cloned())
    }

    async fn find_subscription_by_id(&self, id: i64) -> Result<Option<Subscription>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.subscriptions.iter().find(|s| s.id == id).cloned())
    }

    async fn create_subscription(
        &self,
        subscription: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        if inner.subscriptions.iter().any(|s| {
            s.channel_id == subscription.channel_id && s.callback_url == subscription.callback_url
        }) {
            return Err(StoreError::Conflict(format!(
                "duplicate subscription for channel {} and {}",
                subscription.channel_id, subscription.callback_url
            )));
        }
        let row = Subscription {
            id: inner.next_id(),
            channel_id: subscription.channel_id,
            callback_url: subscription.callback_url,
            is_active: true,
            title: subscription.title,
            photo_url: subscription.photo_url,
            created_at: Utc::now(),
        };
        inner.subscriptions.push(row.clone());
        Ok(row)
    }

    async fn update_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let slot = inner
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        *slot = subscription.clone();
        Ok(subscription.clone())
    }

    async fn delete_subscription(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        inner.subscriptions.retain(|s| s.id != id);
        Ok(())
    }
}
