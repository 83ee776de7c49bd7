//! Process configuration, sourced from the environment at startup.
//!
//! The endpoint and store settings are read once into immutable records;
//! nothing else in the pipeline touches the environment.

use anyhow::{Context, Result};

/// Upstream feed endpoint settings.
///
/// The fetch URL is `{base_url}{city}.proto`; the API key travels as a query
/// parameter added per request (see [`crate::fetch::auth::UrlParam`]), so the
/// stored URL never contains the credential.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
    pub city: String,
    pub api_key: String,
}

impl EndpointConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: require_env("base_url")?,
            city: require_env("city")?,
            api_key: require_env("api_key")?,
        })
    }

    /// The feed URL without credentials, safe to log.
    pub fn feed_url(&self) -> String {
        format!("{}{}.proto", self.base_url, self.city)
    }
}

/// Snapshot store connection parameters.
///
/// All three are mandatory: without a reachable store there is nothing to
/// collect into, so startup aborts before the first fetch.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_values(
            std::env::var("REDIS_HOST").ok(),
            std::env::var("REDIS_PORT").ok(),
            std::env::var("REDIS_DB").ok(),
        )
    }

    fn from_values(
        host: Option<String>,
        port: Option<String>,
        db: Option<String>,
    ) -> Result<Self> {
        let host = host.context("REDIS_HOST is not set; refusing to start without a snapshot store")?;
        let port = port.context("REDIS_PORT is not set; refusing to start without a snapshot store")?;
        let db = db.context("REDIS_DB is not set; refusing to start without a snapshot store")?;

        Ok(Self {
            host,
            port: port
                .parse()
                .with_context(|| format!("REDIS_PORT is not a valid port number: {port}"))?,
            db: db
                .parse()
                .with_context(|| format!("REDIS_DB is not a valid database index: {db}"))?,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .with_context(|| format!("required environment variable `{name}` is not set"))
}
