use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("channel page answered {0}")]
    Unreachable(u16),
    #[error("channel is private or inaccessible")]
    Private,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Display metadata cached on the subscription at registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMeta {
    pub title: Option<String>,
    pub photo_url: Option<String>,
}

/// Reachability check run before any registration state is written.
#[async_trait]
pub trait ChannelProbe: Send + Sync {
    async fn probe(&self, channel_name: &str) -> Result<ChannelMeta, ProbeError>;
}

pub type DynChannelProbe = std::sync::Arc<dyn ChannelProbe>;

/// Probes the channel's public page. Public pages always carry an
/// `og:title` meta; a 200 without one is the private-or-inaccessible
/// signal.
pub struct HttpChannelProbe {
    http: reqwest::Client,
    base_url: String,
}

impl HttpChannelProbe {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProbeError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).expect("meta selector");
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.to_string())
}

#[async_trait]
impl ChannelProbe for HttpChannelProbe {
    async fn probe(&self, channel_name: &str) -> Result<ChannelMeta, ProbeError> {
        let url = format!("{}/{channel_name}", self.base_url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ProbeError::Unreachable(response.status().as_u16()));
        }

        let document = Html::parse_document(&response.text().await?);
        let title = meta_content(&document, r#"meta[property="og:title"]"#);
        if title.is_none() {
            return Err(ProbeError::Private);
        }
        Ok(ChannelMeta {
            title,
            photo_url: meta_content(&document, r#"meta[property="og:image"]"#),
        })
    }
}
