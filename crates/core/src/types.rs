use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Inbound notification as posted by the forwarder agent, one per new post.
/// Lives only for the duration of a single pipeline invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundPost {
    pub id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub date_published: String,
    pub last_updated: String,
}

impl InboundPost {
    pub fn guid(&self) -> &str {
        &self.id
    }

    /// Publication timestamp, RFC 3339 with a trailing `Z` normalized to
    /// UTC. An unparsable date falls back to the current time instead of
    /// rejecting the post.
    pub fn published_at(&self) -> DateTime<Utc> {
        match DateTime::parse_from_rfc3339(&self.date_published) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(err) => {
                error!(date = %self.date_published, %err, "failed to parse publication date");
                Utc::now()
            }
        }
    }
}

/// Normalized post, built once per notification and shared read-only across
/// every delivery attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedPost {
    pub title: String,
    pub link: String,
    pub guid: String,
    pub published_at: DateTime<Utc>,
    pub text: String,
    pub links: Vec<String>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub channel_name: String,
    pub raw_content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(date: &str) -> InboundPost {
        InboundPost {
            id: "https://t.me/test_channel/1234".to_string(),
            url: "https://t.me/test_channel/1234".to_string(),
            title: "title".to_string(),
            description: String::new(),
            content: "<p>body</p>".to_string(),
            date_published: date.to_string(),
            last_updated: date.to_string(),
        }
    }

    #[test]
    fn test_published_at_accepts_zulu_suffix() {
        let parsed = post("2024-12-26T13:00:26Z").published_at();
        assert_eq!(parsed.to_rfc3339(), "2024-12-26T13:00:26+00:00");
    }

    #[test]
    fn test_published_at_accepts_explicit_offset() {
        let parsed = post("2024-12-26T13:00:26+03:00").published_at();
        assert_eq!(parsed.to_rfc3339(), "2024-12-26T10:00:26+00:00");
    }

    #[test]
    fn test_published_at_falls_back_on_garbage() {
        let before = Utc::now();
        let parsed = post("yesterday-ish").published_at();
        assert!(parsed >= before);
    }

    #[test]
    fn test_guid_aliases_id() {
        assert_eq!(post("2024-12-26T13:00:26Z").guid(), "https://t.me/test_channel/1234");
    }
}
