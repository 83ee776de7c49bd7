//! The polling loop: fetch with bounded retries, decode, snapshot.
//!
//! One cycle derives a second-resolution timestamp key, runs fetch+decode
//! attempts until one succeeds or the budget is spent, then writes either the
//! canonical feed text or an explicit failure sentinel under that key. The
//! loop sleeps between cycles and stops when the shutdown signal flips.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::fetch::{self, HttpClient};
use crate::gtfs_rt::FeedMessage;
use crate::parser::{parse_feed, to_canonical_text};
use crate::store::Snapshots;

/// One upstream feed, fetchable as raw bytes.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// [`FeedSource`] backed by an HTTP endpoint.
pub struct HttpFeedSource<C> {
    client: C,
    url: String,
}

impl<C: HttpClient> HttpFeedSource<C> {
    pub fn new(client: C, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl<C: HttpClient> FeedSource for HttpFeedSource<C> {
    async fn fetch(&self) -> Result<Vec<u8>> {
        fetch::fetch_bytes(&self.client, &self.url).await
    }
}

/// Why one fetch+decode attempt failed.
///
/// Transport failures and malformed payloads are kept apart in logs and in
/// the stored sentinel; both currently count against the same attempt budget.
pub enum AttemptError {
    Fetch(anyhow::Error),
    Decode(anyhow::Error),
}

impl AttemptError {
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Fetch(_) => "fetch",
            AttemptError::Decode(_) => "decode",
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Fetch(e) => write!(f, "fetch failed: {e:#}"),
            AttemptError::Decode(e) => write!(f, "decode failed: {e:#}"),
        }
    }
}

/// Timing and retry knobs for the poll loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Upper bound on fetch+decode attempts per cycle. Treated as at least 1.
    pub max_retries: usize,
    /// Pause between failed attempts within one cycle.
    pub retry_pause: Duration,
    /// Sleep between cycles.
    pub waiting_time: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_pause: Duration::from_secs(1),
            waiting_time: Duration::from_secs(60),
        }
    }
}

/// Formats `ts` as the second-resolution snapshot key, e.g.
/// `20240305_140709`.
///
/// The key is derived once per cycle, so every retry within a cycle targets
/// the same snapshot. Two cycles landing in the same second overwrite.
pub fn snapshot_key(ts: DateTime<Local>) -> String {
    ts.format("%Y%m%d_%H%M%S").to_string()
}

/// Value stored when a cycle exhausts its attempts without a decodable feed.
///
/// An explicit, parseable record: a gap in the data must be distinguishable
/// from a feed that was genuinely empty.
fn failure_sentinel(last_error: &AttemptError, attempts: usize) -> String {
    json!({
        "error": {
            "kind": last_error.kind(),
            "attempts": attempts,
            "message": last_error.to_string(),
        }
    })
    .to_string()
}

/// Drives fetch, decode and store on a fixed cadence.
pub struct Poller {
    config: PollerConfig,
}

impl Poller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    async fn attempt<S: FeedSource>(
        &self,
        source: &S,
    ) -> Result<(FeedMessage, String), AttemptError> {
        let bytes = source.fetch().await.map_err(AttemptError::Fetch)?;
        debug!(bytes = bytes.len(), "Feed bytes received, decoding");

        let feed = parse_feed(&bytes).map_err(AttemptError::Decode)?;
        let text = to_canonical_text(&feed).map_err(AttemptError::Decode)?;
        Ok((feed, text))
    }

    /// Runs attempts until one succeeds or the budget is spent, pausing
    /// between failures. Returns the last error when every attempt failed.
    async fn fetch_with_retries<S: FeedSource>(
        &self,
        source: &S,
        attempts: usize,
    ) -> Result<(FeedMessage, String), AttemptError> {
        let mut attempt = 1;
        loop {
            debug!(attempt, max = attempts, "Fetching feed");
            match self.attempt(source).await {
                Ok(decoded) => return Ok(decoded),
                Err(e) => {
                    warn!(attempt, max = attempts, kind = e.kind(), error = %e, "Attempt failed");
                    if attempt == attempts {
                        return Err(e);
                    }
                    attempt += 1;
                    tokio::time::sleep(self.config.retry_pause).await;
                }
            }
        }
    }

    /// One full poll cycle: derive the snapshot key, fetch with retries,
    /// store the canonical text or the failure sentinel.
    ///
    /// Nothing escapes this method: a cycle that fails end to end is logged
    /// and the caller moves on to the next one.
    pub async fn run_cycle<S, St>(&self, source: &S, store: &mut St)
    where
        S: FeedSource,
        St: Snapshots,
    {
        let key = snapshot_key(Local::now());
        info!(%key, "Starting poll cycle");

        let attempts = self.config.max_retries.max(1);
        let value = match self.fetch_with_retries(source, attempts).await {
            Ok((feed, text)) => {
                info!(entity_count = feed.entity.len(), "Feed fetched and decoded");
                text
            }
            Err(e) => {
                error!(kind = e.kind(), attempts, error = %e, "No feed obtained, storing failure sentinel");
                failure_sentinel(&e, attempts)
            }
        };

        match store.put(&key, &value).await {
            Ok(()) => info!(%key, bytes = value.len(), "Snapshot stored"),
            Err(e) => error!(%key, error = %e, "Snapshot write failed"),
        }
    }

    /// Runs cycles until `shutdown` reads true.
    ///
    /// The signal is checked at the start of each cycle and interrupts the
    /// inter-cycle sleep; a cycle already in flight finishes its store step
    /// first.
    pub async fn run<S, St>(&self, source: &S, store: &mut St, mut shutdown: watch::Receiver<bool>)
    where
        S: FeedSource,
        St: Snapshots,
    {
        loop {
            if *shutdown.borrow() {
                info!("Shutdown requested, stopping poll loop");
                break;
            }

            self.run_cycle(source, store).await;

            debug!(secs = self.config.waiting_time.as_secs(), "Waiting before next cycle");
            tokio::select! {
                _ = tokio::time::sleep(self.config.waiting_time) => {}
                res = shutdown.changed() => {
                    // A closed channel means no shutdown can ever arrive;
                    // stop rather than spin.
                    if res.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
