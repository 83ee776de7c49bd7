//! Snapshot persistence against Redis.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

use crate::config::StoreConfig;

/// Write capability for feed snapshots: an unconditional `put` of a text
/// value at a string key, last write wins.
#[async_trait]
pub trait Snapshots: Send {
    async fn put(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Redis-backed [`Snapshots`] holding one connection for the process
/// lifetime.
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects eagerly. An unreachable store is an error here, before any
    /// polling has started.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self> {
        let url = format!("redis://{}:{}/{}", cfg.host, cfg.port, cfg.db);
        let client = redis::Client::open(url.as_str())
            .with_context(|| format!("invalid redis URL {url}"))?;

        let conn = ConnectionManager::new(client)
            .await
            .with_context(|| format!("cannot reach redis at {}:{}", cfg.host, cfg.port))?;

        info!(host = %cfg.host, port = cfg.port, db = cfg.db, "Connected to snapshot store");
        Ok(Self { conn })
    }

    /// Releases the connection.
    pub fn disconnect(self) {
        drop(self.conn);
        info!("Snapshot store connection closed");
    }
}

#[async_trait]
impl Snapshots for RedisStore {
    async fn put(&mut self, key: &str, value: &str) -> Result<()> {
        let _: () = self
            .conn
            .set(key, value)
            .await
            .with_context(|| format!("failed to write snapshot {key}"))?;
        Ok(())
    }
}
