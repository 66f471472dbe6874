use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("agent api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed agent response: {0}")]
    MalformedResponse(String),
}

/// Event wiring of one agent: agents it receives events from and agents it
/// forwards events to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgentLinks {
    pub sources: Vec<i64>,
    pub receivers: Vec<i64>,
}

/// The external automation control plane. One poller agent watches a
/// channel's feed; one forwarder agent posts each new item back to the
/// relay's inbound endpoint.
#[async_trait]
pub trait Automation: Send + Sync {
    async fn create_poller_agent(&self, channel_name: &str) -> Result<i64, AutomationError>;
    async fn create_forwarder_agent(&self, channel_name: &str) -> Result<i64, AutomationError>;
    async fn link_agents(&self, source_id: i64, target_id: i64) -> Result<(), AutomationError>;
    async fn start_agent(&self, agent_id: i64) -> Result<(), AutomationError>;
    async fn agent_status(&self, agent_id: i64) -> Result<Value, AutomationError>;
    async fn agent_links(&self, agent_id: i64) -> Result<AgentLinks, AutomationError>;
    async fn delete_agent(&self, agent_id: i64) -> Result<(), AutomationError>;
}

pub type DynAutomation = std::sync::Arc<dyn Automation>;

#[derive(Debug, Clone)]
pub struct HuginnConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Base URL of the feed host the poller agent reads from.
    pub rsshub_url: String,
    /// Full URL of the relay's inbound notification endpoint.
    pub webhook_url: String,
}

enum Session {
    Unauthenticated,
    Authenticated { csrf_token: String },
}

/// Huginn client over its cookie-session JSON API. Redirect following is
/// disabled so the 302 that Huginn answers with on an expired session stays
/// observable; `request` re-authenticates exactly once on it.
pub struct HuginnClient {
    http: reqwest::Client,
    config: HuginnConfig,
    session: Mutex<Session>,
}

fn extract_csrf_token(html: &str) -> Result<String, AutomationError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"meta[name="csrf-token"]"#).expect("csrf selector");
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|token| token.to_string())
        .ok_or_else(|| AutomationError::Auth("csrf token not found in sign-in page".to_string()))
}

impl HuginnClient {
    pub fn new(config: HuginnConfig) -> Result<Self, AutomationError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            config,
            session: Mutex::new(Session::Unauthenticated),
        })
    }

    /// Signs in and returns a fresh CSRF token. The session cookie lands in
    /// the cookie store as a side effect.
    async fn authenticate(&self) -> Result<String, AutomationError> {
        let login_url = format!("{}/users/sign_in", self.config.base_url);
        info!(url = %login_url, "authenticating with automation host");

        let page = self.http.get(&login_url).send().await?;
        if page.status() != StatusCode::OK {
            return Err(AutomationError::Auth(format!(
                "sign-in page answered {}",
                page.status()
            )));
        }
        let csrf_token = extract_csrf_token(&page.text().await?)?;

        let form = [
            ("user[login]", self.config.username.as_str()),
            ("user[password]", self.config.password.as_str()),
            ("user[remember_me]", "1"),
            ("authenticity_token", csrf_token.as_str()),
            ("commit", "Log in"),
        ];
        let response = self
            .http
            .post(&login_url)
            .header("X-CSRF-Token", &csrf_token)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            // A re-rendered form instead of a redirect means rejection.
            let body = response.text().await?;
            if body.contains("Invalid Login or password") {
                return Err(AutomationError::Auth("invalid credentials".to_string()));
            }
        } else if !status.is_redirection() {
            return Err(AutomationError::Auth(format!("sign-in answered {status}")));
        }

        // The post-login page carries the token all API calls must echo.
        let dashboard = self.http.get(&self.config.base_url).send().await?;
        if dashboard.status() != StatusCode::OK {
            return Err(AutomationError::Auth(format!(
                "dashboard answered {} after sign-in",
                dashboard.status()
            )));
        }
        extract_csrf_token(&dashboard.text().await?)
    }

    async fn csrf_token(&self) -> Result<String, AutomationError> {
        let mut session = self.session.lock().await;
        if let Session::Authenticated { csrf_token } = &*session {
            return Ok(csrf_token.clone());
        }
        let token = self.authenticate().await?;
        *session = Session::Authenticated {
            csrf_token: token.clone(),
        };
        Ok(token)
    }

    async fn reauthenticate(&self) -> Result<String, AutomationError> {
        let mut session = self.session.lock().await;
        *session = Session::Unauthenticated;
        let token = self.authenticate().await?;
        *session = Session::Authenticated {
            csrf_token: token.clone(),
        };
        Ok(token)
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        csrf_token: &str,
    ) -> Result<reqwest::Response, AutomationError> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let mut request = self
            .http
            .request(method, &url)
            .header("X-CSRF-Token", csrf_token)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, AutomationError> {
        let csrf_token = self.csrf_token().await?;
        let mut response = self
            .send(method.clone(), endpoint, body, &csrf_token)
            .await?;

        if response.status().is_redirection() {
            // Session expired. One re-authentication, then give up.
            info!(endpoint, "automation session expired, re-authenticating");
            let csrf_token = self.reauthenticate().await?;
            response = self.send(method, endpoint, body, &csrf_token).await?;
            if response.status().is_redirection() {
                return Err(AutomationError::Auth(
                    "session still expired after re-authentication".to_string(),
                ));
            }
        }

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(AutomationError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response)
    }

    async fn create_agent(&self, payload: &Value) -> Result<i64, AutomationError> {
        let response = self.request(Method::POST, "/agents.json", Some(payload)).await?;
        let body: Value = response.json().await?;
        body.get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| AutomationError::MalformedResponse("agent id missing".to_string()))
    }

    fn poller_payload(&self, channel_name: &str) -> Value {
        json!({
            "agent": {
                "type": "Agents::RssAgent",
                "name": format!("RSS Monitor - {channel_name}"),
                "schedule": "every_1m",
                "options": {
                    "expected_update_period_in_days": "2",
                    "url": [format!("{}/telegram/channel/{channel_name}", self.config.rsshub_url)],
                    "mode": "on_change",
                    "type": "json",
                    "clean": "false"
                }
            }
        })
    }

    fn forwarder_payload(&self, channel_name: &str) -> Value {
        json!({
            "agent": {
                "type": "Agents::PostAgent",
                "name": format!("Post Agent - {channel_name}"),
                "payload_mode": "merge",
                "options": {
                    "post_url": self.config.webhook_url,
                    "expected_receive_period_in_days": "2",
                    "content_type": "json",
                    "method": "post",
                    "payload": {
                        "title": "{{ title }}",
                        "link": "{{ url }}",
                        "guid": "{{ guid }}",
                        "description": "{{ description }}",
                        "published": "{{ published }}"
                    },
                    "headers": {
                        "Content-Type": "application/json"
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Automation for HuginnClient {
    async fn create_poller_agent(&self, channel_name: &str) -> Result<i64, AutomationError> {
        info!(%channel_name, "creating poller agent");
        self.create_agent(&self.poller_payload(channel_name)).await
    }

    async fn create_forwarder_agent(&self, channel_name: &str) -> Result<i64, AutomationError> {
        info!(%channel_name, webhook_url = %self.config.webhook_url, "creating forwarder agent");
        self.create_agent(&self.forwarder_payload(channel_name)).await
    }

    async fn link_agents(&self, source_id: i64, target_id: i64) -> Result<(), AutomationError> {
        info!(source_id, target_id, "linking agents");
        let payload = json!({
            "agent": { "receiver_ids": [target_id] },
            "commit": "Update"
        });
        self.request(
            Method::PUT,
            &format!("/agents/{source_id}.json"),
            Some(&payload),
        )
        .await?;
        Ok(())
    }

    async fn start_agent(&self, agent_id: i64) -> Result<(), AutomationError> {
        info!(agent_id, "starting agent");
        self.request(Method::POST, &format!("/agents/{agent_id}/run"), None)
            .await?;
        Ok(())
    }

    async fn agent_status(&self, agent_id: i64) -> Result<Value, AutomationError> {
        let response = self
            .request(Method::GET, &format!("/agents/{agent_id}.json"), None)
            .await?;
        Ok(response.json().await?)
    }

    async fn agent_links(&self, agent_id: i64) -> Result<AgentLinks, AutomationError> {
        let body = self.agent_status(agent_id).await?;
        let ids = |key: &str| -> Vec<i64> {
            body.get(key)
                .and_then(Value::as_array)
                .map(|values| values.iter().filter_map(Value::as_i64).collect())
                .unwrap_or_default()
        };
        Ok(AgentLinks {
            sources: ids("source_ids"),
            receivers: ids("receiver_ids"),
        })
    }

    async fn delete_agent(&self, agent_id: i64) -> Result<(), AutomationError> {
        info!(agent_id, "deleting agent");
        self.request(Method::DELETE, &format!("/agents/{agent_id}.json"), None)
            .await?;
        Ok(())
    }
}
