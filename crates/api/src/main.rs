use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

mod error;
mod middleware;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod testutil;

use relay_core::config::Settings;
use relay_db::{DynStore, PgStore};
use relay_huginn::{
    DynAutomation, DynChannelProbe, HttpChannelProbe, HuginnClient, HuginnConfig,
};

use crate::services::delivery::DeliveryClient;
use crate::services::pipeline::IngestionPipeline;
use crate::services::registration::RegistrationWorkflow;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.database_url)
        .await?;
    let store: DynStore = Arc::new(PgStore::new(db));

    let automation: DynAutomation = Arc::new(HuginnClient::new(HuginnConfig {
        base_url: settings.huginn_url.clone(),
        username: settings.huginn_admin_username.clone(),
        password: settings.huginn_admin_password.clone(),
        rsshub_url: settings.rsshub_url.clone(),
        webhook_url: format!("{}/webhook/rss", settings.public_url.trim_end_matches('/')),
    })?);

    let probe: Option<DynChannelProbe> = if settings.verify_channels {
        Some(Arc::new(HttpChannelProbe::new(
            &settings.probe_base,
            Duration::from_secs(settings.probe_timeout_secs),
        )?))
    } else {
        None
    };

    let delivery = DeliveryClient::new(
        Duration::from_secs(settings.delivery_timeout_secs),
        settings.delivery_retries,
    )?;

    let state = AppState {
        pipeline: Arc::new(IngestionPipeline::new(store.clone(), delivery)),
        registration: Arc::new(RegistrationWorkflow::new(store, automation, probe)),
    };

    let addr: SocketAddr = settings.api_bind.parse()?;
    info!(%addr, env = %settings.relay_env, "starting api");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, routes::app(state)).await?;

    Ok(())
}
