//! Scorewatch tracking daemon.
//!
//! Loads the persisted score history from RocksDB, samples every tracked user
//! on a fixed cadence, raises alerts on score increases, and prunes history
//! older than the retention window. Runs until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use scorewatch_core::traits::SystemClock;
use scorewatch_node_lib::notify::LogNotifier;
use scorewatch_node_lib::sampler::SnapshotFileSampler;
use scorewatch_node_lib::{NotifyPolicy, RocksStore, Tracker, WatchConfig};
use tokio::sync::watch;
use tracing::{error, info};

/// Scorewatch daemon: track leaderboard scores and flag suspicious jumps.
#[derive(Parser, Debug)]
#[command(
    name = "scorewatch-node",
    version,
    about = "Track user scores and alert on uncorroborated increases"
)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory for score storage
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// JSON snapshot file written by the scraper
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Seconds between sampling passes
    #[arg(long)]
    sample_interval_secs: Option<u64>,

    /// Which alerts to notify about (suspicious_only, all, silent)
    #[arg(long)]
    notify: Option<NotifyPolicy>,

    /// Extra usernames to track (comma-separated)
    #[arg(long, value_delimiter = ',')]
    track: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

impl Args {
    /// Layer CLI flags over the loaded configuration.
    fn into_config(self) -> Result<(WatchConfig, String)> {
        let mut config =
            WatchConfig::load(self.config.as_deref()).context("loading configuration")?;

        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(snapshot) = self.snapshot {
            config.snapshot_path = Some(snapshot);
        }
        if let Some(secs) = self.sample_interval_secs {
            config.sample_interval_secs = secs;
        }
        if let Some(policy) = self.notify {
            config.notify = policy;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        config.tracked_users.extend(self.track);
        config.validate().context("invalid configuration")?;

        Ok((config, self.log_format))
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let (config, log_format) = Args::parse().into_config()?;
    init_logging(&config.log_level, &log_format);

    info!("Scorewatch v{}", env!("CARGO_PKG_VERSION"));
    info!("data_dir: {:?}", config.data_dir);
    info!("snapshot: {:?}", config.snapshot_path);
    info!("notify: {}", config.notify);

    let Some(snapshot) = config.snapshot_path.clone() else {
        bail!("no snapshot file configured; pass --snapshot or set snapshot_path");
    };

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

    let store = RocksStore::open(config.db_path()).context("opening score database")?;
    let tracker = Tracker::from_config(
        &config,
        Box::new(store),
        Arc::new(LogNotifier),
        Arc::new(SystemClock),
    )
    .context("starting tracker")?;
    info!(users = tracker.usernames().len(), "tracker ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down..."),
            Err(e) => error!("failed to listen for Ctrl+C: {e}"),
        }
        let _ = shutdown_tx.send(true);
    });

    let mut sampler = SnapshotFileSampler::new(snapshot);
    tracker
        .run(&mut sampler, config.cadence(), shutdown_rx)
        .await;

    info!("Scorewatch shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_config() {
        let args = Args::parse_from([
            "scorewatch-node",
            "--data-dir",
            "/tmp/sw",
            "--snapshot",
            "/tmp/sw/snap.json",
            "--sample-interval-secs",
            "60",
            "--notify",
            "all",
            "--track",
            "alice,bob",
            "--log-format",
            "json",
        ]);
        let (config, format) = args.into_config().unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/sw"));
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/sw/snap.json")));
        assert_eq!(config.sample_interval_secs, 60);
        assert_eq!(config.notify, NotifyPolicy::All);
        assert_eq!(config.tracked_users, vec!["alice", "bob"]);
        assert_eq!(format, "json");
    }

    #[test]
    fn zero_interval_rejected() {
        let args = Args::parse_from(["scorewatch-node", "--sample-interval-secs", "0"]);
        assert!(args.into_config().is_err());
    }
}
