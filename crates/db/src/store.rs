use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Channel, Subscription};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-constraint violation: duplicate channel name or duplicate
    /// (channel_id, callback_url) pair, typically from a concurrent create.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Fields for a new subscription row. Display metadata comes from the
/// channel probe when available.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub channel_id: i64,
    pub callback_url: String,
    pub title: Option<String>,
    pub photo_url: Option<String>,
}

/// Repository boundary over durable channel/subscription state. The store
/// is the only shared mutable resource; callers must not assume a row is
/// unchanged between a read and a later write.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_channel_by_name(&self, name: &str) -> Result<Option<Channel>, StoreError>;
    async fn find_channel_by_id(&self, id: i64) -> Result<Option<Channel>, StoreError>;
    async fn create_channel(&self, channel_name: &str) -> Result<Channel, StoreError>;
    async fn update_channel(&self, channel: &Channel) -> Result<Channel, StoreError>;
    /// Subscriptions cascade-delete with the channel.
    async fn delete_channel(&self, id: i64) -> Result<(), StoreError>;

    async fn find_active_subscriptions(
        &self,
        channel_id: i64,
    ) -> Result<Vec<Subscription>, StoreError>;
    async fn find_subscription(
        &self,
        channel_id: i64,
        callback_url: &str,
    ) -> Result<Option<Subscription>, StoreError>;
    async fn find_subscription_by_id(&self, id: i64) -> Result<Option<Subscription>, StoreError>;
    async fn create_subscription(
        &self,
        subscription: NewSubscription,
    ) -> Result<Subscription, StoreError>;
    async fn update_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, StoreError>;
    async fn delete_subscription(&self, id: i64) -> Result<(), StoreError>;
}

pub type DynStore = std::sync::Arc<dyn Store>;
