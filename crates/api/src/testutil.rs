use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use serde_json::Value;

use relay_db::memory::MemoryStore;
use relay_db::{NewSubscription, Store};
use relay_huginn::{AgentLinks, Automation, AutomationError};

use crate::routes;
use crate::services::delivery::DeliveryClient;
use crate::services::pipeline::IngestionPipeline;
use crate::services::registration::RegistrationWorkflow;
use crate::state::AppState;

/// Automation double that always succeeds and hands out sequential agent ids.
#[derive(Default)]
struct NullAutomation {
    next_id: AtomicI64,
}

#[async_trait]
impl Automation for NullAutomation {
    async fn create_poller_agent(&self, _channel_name: &str) -> Result<i64, AutomationError> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn create_forwarder_agent(&self, _channel_name: &str) -> Result<i64, AutomationError> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn link_agents(&self, _source_id: i64, _target_id: i64) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn start_agent(&self, _agent_id: i64) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn agent_status(&self, _agent_id: i64) -> Result<Value, AutomationError> {
        Ok(Value::Null)
    }

    async fn agent_links(&self, _agent_id: i64) -> Result<AgentLinks, AutomationError> {
        Ok(AgentLinks::default())
    }

    async fn delete_agent(&self, _agent_id: i64) -> Result<(), AutomationError> {
        Ok(())
    }
}

/// Full router over an in-memory store, with channel verification off.
pub fn app_with_store() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let delivery = DeliveryClient::new(Duration::from_secs(5), 0).expect("delivery client");
    let state = AppState {
        pipeline: Arc::new(IngestionPipeline::new(store.clone(), delivery)),
        registration: Arc::new(RegistrationWorkflow::new(
            store.clone(),
            Arc::new(NullAutomation::default()),
            None,
        )),
    };
    (routes::app(state), store)
}

/// Seeds one channel with one active subscription, returning the channel id.
pub async fn seed_subscription(
    store: &MemoryStore,
    channel_name: &str,
    callback_url: &str,
) -> i64 {
    let channel = store.create_channel(channel_name).await.expect("channel");
    store
        .create_subscription(NewSubscription {
            channel_id: channel.id,
            callback_url: callback_url.to_string(),
            title: None,
            photo_url: None,
        })
        .await
        .expect("subscription");
    channel.id
}
