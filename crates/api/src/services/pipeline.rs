use futures_util::future;
use tracing::{debug, error, info, warn};

use relay_core::channel::extract_channel_name;
use relay_core::error::{RelayError, RelayResult};
use relay_core::parser::parse_html;
use relay_core::types::{InboundPost, ParsedPost};
use relay_db::DynStore;

use super::delivery::DeliveryClient;
use super::store_err;

/// What happened to one inbound post. Informational only: once the post is
/// parsed, per-subscriber delivery failures do not fail the invocation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub subscribers: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct IngestionPipeline {
    store: DynStore,
    delivery: DeliveryClient,
}

impl IngestionPipeline {
    pub fn new(store: DynStore, delivery: DeliveryClient) -> Self {
        Self { store, delivery }
    }

    pub async fn process(&self, post: InboundPost) -> RelayResult<PipelineOutcome> {
        info!(guid = %post.guid(), url = %post.url, "processing inbound post");

        let channel_name = extract_channel_name(&post.url)
            .ok_or_else(|| RelayError::Validation(format!("invalid post URL: {}", post.url)))?;

        let channel = self
            .store
            .find_channel_by_name(&channel_name)
            .await
            .map_err(store_err)?
            .ok_or_else(|| RelayError::NotFound(format!("channel {channel_name} is not registered")))?;

        let subscriptions = self
            .store
            .find_active_subscriptions(channel.id)
            .await
            .map_err(store_err)?;

        if subscriptions.is_empty() {
            warn!(%channel_name, "no active subscriptions, dropping post");
            return Ok(PipelineOutcome::default());
        }

        debug!(%channel_name, count = subscriptions.len(), "fanning out to subscribers");

        let content = parse_html(&post.content);
        let parsed = ParsedPost {
            title: post.title.clone(),
            link: post.url.clone(),
            guid: post.guid().to_string(),
            published_at: post.published_at(),
            text: content.text,
            links: content.links,
            images: content.images,
            videos: content.videos,
            channel_name: channel_name.clone(),
            raw_content: post.content.clone(),
        };

        // One slow or broken subscriber must not block the others; each
        // attempt resolves to its own verdict.
        let attempts = subscriptions.iter().map(|subscription| {
            let parsed = &parsed;
            async move {
                match self
                    .delivery
                    .deliver(&subscription.callback_url, parsed)
                    .await
                {
                    Ok(()) => true,
                    Err(err) => {
                        error!(
                            subscription_id = subscription.id,
                            callback_url = %subscription.callback_url,
                            %err,
                            "delivery failed"
                        );
                        false
                    }
                }
            }
        });
        let verdicts = future::join_all(attempts).await;

        let delivered = verdicts.iter().filter(|ok| **ok).count();
        let outcome = PipelineOutcome {
            subscribers: subscriptions.len(),
            delivered,
            failed: subscriptions.len() - delivered,
        };
        info!(
            guid = %post.guid(),
            delivered = outcome.delivered,
            failed = outcome.failed,
            "finished processing post"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use relay_db::memory::MemoryStore;
    use relay_db::{NewSubscription, Store};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn inbound(url: &str) -> InboundPost {
        serde_json::from_value(serde_json::json!({
            "id": format!("{url}#guid"),
            "url": url,
            "title": "Post title",
            "description": "desc",
            "content": r#"<p>hello</p><a href="https://example.com/file.mp4">clip</a>"#,
            "date_published": "2024-05-01T10:00:00Z",
            "last_updated": "2024-05-01T10:00:00Z",
        }))
        .unwrap()
    }

    fn pipeline(store: Arc<MemoryStore>) -> IngestionPipeline {
        let delivery = DeliveryClient::new(Duration::from_secs(5), 0).unwrap();
        IngestionPipeline::new(store, delivery)
    }

    async fn seed_channel(store: &MemoryStore, name: &str) -> i64 {
        store.create_channel(name).await.unwrap().id
    }

    async fn seed_subscription(store: &MemoryStore, channel_id: i64, callback_url: &str) {
        store
            .create_subscription(NewSubscription {
                channel_id,
                callback_url: callback_url.to_string(),
                title: None,
                photo_url: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delivers_parsed_post_to_subscriber() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "title": "Post title",
                "text": "hello clip",
                // the .mp4 anchor is excluded from links, not promoted
                "links": [],
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let channel_id = seed_channel(&store, "test_channel").await;
        seed_subscription(&store, channel_id, &format!("{}/hook", server.uri())).await;

        let outcome = pipeline(store)
            .process(inbound("https://t.me/test_channel/42"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PipelineOutcome {
                subscribers: 1,
                delivered: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_channel_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let err = pipeline(store)
            .process(inbound("https://t.me/nobody_home/1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let err = pipeline(store)
            .process(inbound("not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)));
    }

    #[tokio::test]
    async fn test_no_active_subscriptions_is_a_quiet_success() {
        let store = Arc::new(MemoryStore::new());
        seed_channel(&store, "test_channel").await;

        let outcome = pipeline(store)
            .process(inbound("https://t.me/test_channel/42"))
            .await
            .unwrap();
        assert_eq!(outcome, PipelineOutcome::default());
    }

    #[tokio::test]
    async fn test_one_failing_subscriber_does_not_block_the_rest() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/good"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let channel_id = seed_channel(&store, "test_channel").await;
        seed_subscription(&store, channel_id, &format!("{}/bad", server.uri())).await;
        seed_subscription(&store, channel_id, &format!("{}/good", server.uri())).await;

        let outcome = pipeline(store)
            .process(inbound("https://t.me/test_channel/42"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PipelineOutcome {
                subscribers: 2,
                delivered: 1,
                failed: 1
            }
        );
    }
}
