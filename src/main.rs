//! CLI entry point for the GTFS-RT snapshot collector.
//!
//! Loads configuration, connects to the snapshot store (refusing to start
//! without one), then polls the upstream feed on a fixed cadence until a
//! shutdown signal arrives.

use anyhow::Result;
use clap::Parser;
use gtfs_rt_snapshotter::config::{EndpointConfig, StoreConfig};
use gtfs_rt_snapshotter::fetch::{BasicClient, auth::UrlParam};
use gtfs_rt_snapshotter::poller::{HttpFeedSource, Poller, PollerConfig};
use gtfs_rt_snapshotter::store::RedisStore;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_snapshotter")]
#[command(about = "Polls a GTFS-RT feed and stores timestamped snapshots in Redis", long_about = None)]
struct Cli {
    /// Seconds to sleep between poll cycles
    #[arg(long, env = "waiting_time", default_value_t = 60)]
    waiting_time: u64,

    /// Fetch+decode attempts per cycle before storing the failure sentinel
    #[arg(long, env = "max_retries", default_value_t = 5)]
    max_retries: usize,

    /// Per-attempt HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    fetch_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/gtfs_rt_snapshotter.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_snapshotter.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    // Both configs are mandatory; a missing parameter aborts here, before
    // any fetch or loop iteration.
    let endpoint = EndpointConfig::from_env()?;
    let store_cfg = StoreConfig::from_env()?;

    info!(url = %endpoint.feed_url(), "Feed endpoint configured");

    let mut store = RedisStore::connect(&store_cfg).await?;

    let client = BasicClient::with_timeout(Duration::from_secs(cli.fetch_timeout))?;
    let client = UrlParam::apikey(client, endpoint.api_key.clone());
    let source = HttpFeedSource::new(client, endpoint.feed_url());

    let poller = Poller::new(PollerConfig {
        max_retries: cli.max_retries,
        retry_pause: Duration::from_secs(1),
        waiting_time: Duration::from_secs(cli.waiting_time),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    info!(
        waiting_time = cli.waiting_time,
        max_retries = cli.max_retries,
        "Starting poll loop"
    );
    poller.run(&source, &mut store, shutdown_rx).await;

    store.disconnect();
    info!("Snapshot collector stopped");
    Ok(())
}
