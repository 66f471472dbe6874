use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use relay_core::retry::retry_with_backoff;
use relay_core::types::ParsedPost;

const BACKOFF_FACTOR: f64 = 2.0;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The subscriber answered with a 4xx/5xx. Not retried: replaying the
    /// same payload against the same endpoint yields the same answer.
    #[error("callback rejected delivery with status {status}")]
    Rejected { status: u16 },
    #[error("callback unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Wire shape posted to subscriber callbacks. `channel_name` is internal
/// routing state and never leaves the service.
#[derive(Debug, Serialize)]
struct DeliveryPayload<'a> {
    title: &'a str,
    link: &'a str,
    guid: &'a str,
    published_at: DateTime<Utc>,
    text: &'a str,
    links: &'a [String],
    images: &'a [String],
    videos: &'a [String],
    raw_content: &'a str,
}

fn delivery_payload(post: &ParsedPost) -> DeliveryPayload<'_> {
    DeliveryPayload {
        title: &post.title,
        link: &post.link,
        guid: &post.guid,
        published_at: post.published_at,
        text: &post.text,
        links: &post.links,
        images: &post.images,
        videos: &post.videos,
        raw_content: &post.raw_content,
    }
}

#[derive(Clone)]
pub struct DeliveryClient {
    http: reqwest::Client,
    retries: u32,
    base_delay: Duration,
}

impl DeliveryClient {
    pub fn new(timeout: Duration, retries: u32) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            retries,
            base_delay: Duration::from_secs(1),
        })
    }

    /// Posts one parsed post to one callback URL. Transport failures and
    /// timeouts are retried with exponential backoff; HTTP rejections are
    /// surfaced immediately.
    pub async fn deliver(&self, callback_url: &str, post: &ParsedPost) -> Result<(), DeliveryError> {
        retry_with_backoff(
            || {
                let request = self
                    .http
                    .post(callback_url)
                    .json(&delivery_payload(post));
                let guid = post.guid.as_str();
                async move {
                    let response = request.send().await?;
                    let status = response.status();
                    if status.as_u16() >= 400 {
                        return Err(DeliveryError::Rejected {
                            status: status.as_u16(),
                        });
                    }
                    debug!(%guid, "delivered post");
                    Ok(())
                }
            },
            self.retries,
            self.base_delay,
            BACKOFF_FACTOR,
            |err| matches!(err, DeliveryError::Transport(_)),
        )
        .await
    }
}
