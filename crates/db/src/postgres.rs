use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{Channel, Subscription};
use crate::store::{NewSubscription, Store, StoreError};

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn find_channel_by_name(&self, name: &str) -> Result<Option<Channel>, StoreError> {
        sqlx::query_as::<_, Channel>(
            r#"
            SELECT id, channel_name, is_monitored, poller_agent_id, forwarder_agent_id, created_at
            FROM channels
            WHERE channel_name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn find_channel_by_id(&self, id: i64) -> Result<Option<Channel>, StoreError> {
        sqlx::query_as::<_, Channel>(
            r#"
            SELECT id, channel_name, is_monitored, poller_agent_id, forwarder_agent_id, created_at
            FROM channels
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn create_channel(&self, channel_name: &str) -> Result<Channel, StoreError> {
        sqlx::query_as::<_, Channel>(
            r#"
            INSERT INTO channels (channel_name)
            VALUES ($1)
            RETURNING id, channel_name, is_monitored, poller_agent_id, forwarder_agent_id, created_at
            "#,
        )
        .bind(channel_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn update_channel(&self, channel: &Channel) -> Result<Channel, StoreError> {
        sqlx::query_as::<_, Channel>(
            r#"
            UPDATE channels
            SET is_monitored = $2, poller_agent_id = $3, forwarder_agent_id = $4
            WHERE id = $1
            RETURNING id, channel_name, is_monitored, poller_agent_id, forwarder_agent_id, created_at
            "#,
        )
        .bind(channel.id)
        .bind(channel.is_monitored)
        .bind(channel.poller_agent_id)
        .bind(channel.forwarder_agent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn delete_channel(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM channels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_active_subscriptions(
        &self,
        channel_id: i64,
    ) -> Result<Vec<Subscription>, StoreError> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, channel_id, callback_url, is_active, title, photo_url, created_at
            FROM subscriptions
            WHERE channel_id = $1 AND is_active = TRUE
            ORDER BY created_at
            "#,
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn find_subscription(
        &self,
        channel_id: i64,
        callback_url: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, channel_id, callback_url, is_active, title, photo_url, created_at
            FROM subscriptions
            WHERE channel_id = $1 AND callback_url = $2
            "#,
        )
        .bind(channel_id)
        .bind(callback_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn find_subscription_by_id(&self, id: i64) -> Result<Option<Subscription>, StoreError> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, channel_id, callback_url, is_active, title, photo_url, created_at
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn create_subscription(
        &self,
        subscription: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (channel_id, callback_url, title, photo_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, channel_id, callback_url, is_active, title, photo_url, created_at
            "#,
        )
        .bind(subscription.channel_id)
        .bind(&subscription.callback_url)
        .bind(&subscription.title)
        .bind(&subscription.photo_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn update_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, StoreError> {
        sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET is_active = $2, title = $3, photo_url = $4
            WHERE id = $1
            RETURNING id, channel_id, callback_url, is_active, title, photo_url, created_at
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.is_active)
        .bind(&subscription.title)
        .bind(&subscription.photo_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn delete_subscription(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}
