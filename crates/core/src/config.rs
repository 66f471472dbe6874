use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub relay_env: String,
    pub api_bind: String,
    pub public_url: String,
    pub huginn_url: String,
    pub huginn_admin_username: String,
    pub huginn_admin_password: String,
    pub rsshub_url: String,
    pub probe_base: String,
    pub delivery_timeout_secs: u64,
    pub delivery_retries: u32,
    pub probe_timeout_secs: u64,
    pub verify_channels: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let database_url =
            std::env::var("DATABASE_URL").or_else(|_| std::env::var("RELAY_DATABASE_URL"))?;
        let relay_env = std::env::var("RELAY_ENV").unwrap_or_else(|_| "dev".to_string());
        let api_bind =
            std::env::var("RELAY_API_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let public_url = std::env::var("RELAY_PUBLIC_URL")?;
        let huginn_url = std::env::var("HUGINN_URL")?;
        let huginn_admin_username = std::env::var("HUGINN_ADMIN_USERNAME")?;
        let huginn_admin_password = std::env::var("HUGINN_ADMIN_PASSWORD")?;
        let rsshub_url =
            std::env::var("RSSHUB_URL").unwrap_or_else(|_| "http://rsshub:1200".to_string());
        let probe_base =
            std::env::var("RELAY_PROBE_BASE").unwrap_or_else(|_| "https://t.me".to_string());
        let delivery_timeout_secs = std::env::var("RELAY_DELIVERY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        let delivery_retries = std::env::var("RELAY_DELIVERY_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);
        let probe_timeout_secs = std::env::var("RELAY_PROBE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let verify_channels = std::env::var("RELAY_VERIFY_CHANNELS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        Ok(Self {
            database_url,
            relay_env,
            api_bind,
            public_url,
            huginn_url,
            huginn_admin_username,
            huginn_admin_password,
            rsshub_url,
            probe_base,
            delivery_timeout_secs,
            delivery_retries,
            probe_timeout_secs,
            verify_channels,
        })
    }
}
