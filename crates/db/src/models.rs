use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A monitored channel. `is_monitored` implies both agent handles are set;
/// a row with only one handle is a provisioning failure that the
/// registration workflow cleans up rather than persists.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Channel {
    pub id: i64,
    pub channel_name: String,
    pub is_monitored: bool,
    pub poller_agent_id: Option<i64>,
    pub forwarder_agent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// One callback URL registered against one channel. At most one row per
/// `(channel_id, callback_url)` pair; duplicates reactivate instead of
/// multiplying.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub channel_id: i64,
    pub callback_url: String,
    pub is_active: bool,
    pub title: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
