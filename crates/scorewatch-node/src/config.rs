//! Tracker configuration.
//!
//! [`WatchConfig`] starts from built-in defaults, then layers an optional
//! TOML file and `SCOREWATCH__*` environment variables on top. Binaries apply
//! their CLI flags last.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use scorewatch_core::constants::{MAX_ALERTS_PER_USER, MAX_SAMPLES_PER_USER, RetentionPolicy};
use scorewatch_core::error::WatchError;

use crate::notify::NotifyPolicy;
use crate::tracker::Cadence;

/// Prefix for environment overrides, e.g. `SCOREWATCH__SAMPLE_INTERVAL_SECS=60`.
pub const ENV_PREFIX: &str = "SCOREWATCH";

/// Configuration for a tracker instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// Seconds between sampling passes over all tracked users.
    pub sample_interval_secs: u64,
    /// Milliseconds to wait between two users within one pass.
    pub inter_sample_delay_ms: u64,
    /// Seconds between retention sweeps.
    pub prune_interval_secs: u64,
    /// Age in days after which samples and alerts are purged.
    pub retention_days: u64,
    /// Per-user sample cap.
    pub max_samples: usize,
    /// Per-user alert cap.
    pub max_alerts: usize,
    /// Which alert kinds reach the notifier.
    pub notify: NotifyPolicy,
    /// Usernames tracked from startup, in addition to persisted ones.
    pub tracked_users: Vec<String>,
    /// JSON file of readings written by the external scraper.
    pub snapshot_path: Option<PathBuf>,
    /// Log level filter string (e.g. "info", "debug", "scorewatch_node_lib=trace").
    pub log_level: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scorewatch");

        Self {
            data_dir,
            sample_interval_secs: 5 * 60,
            inter_sample_delay_ms: 2_000,
            prune_interval_secs: 24 * 60 * 60,
            retention_days: 30,
            max_samples: MAX_SAMPLES_PER_USER,
            max_alerts: MAX_ALERTS_PER_USER,
            notify: NotifyPolicy::default(),
            tracked_users: Vec::new(),
            snapshot_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl WatchConfig {
    /// Load configuration: defaults, then `path` (if given), then environment.
    ///
    /// # Errors
    ///
    /// [`WatchError::Config`] if the file is missing or malformed, a value has
    /// the wrong type, or the result fails [`validate`](Self::validate).
    pub fn load(path: Option<&Path>) -> Result<Self, WatchError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("tracked_users"),
        );

        let cfg: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| WatchError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject zero intervals and zero caps.
    pub fn validate(&self) -> Result<(), WatchError> {
        let checks = [
            (self.sample_interval_secs == 0, "sample_interval_secs must be > 0"),
            (self.prune_interval_secs == 0, "prune_interval_secs must be > 0"),
            (self.retention_days == 0, "retention_days must be > 0"),
            (self.max_samples == 0, "max_samples must be > 0"),
            (self.max_alerts == 0, "max_alerts must be > 0"),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, msg)) => Err(WatchError::Config((*msg).to_string())),
            None => Ok(()),
        }
    }

    /// Path to the RocksDB score data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("scoredata")
    }

    /// Timer settings for [`crate::tracker::Tracker::run`].
    pub fn cadence(&self) -> Cadence {
        Cadence {
            sample_interval: Duration::from_secs(self.sample_interval_secs),
            inter_sample_delay: Duration::from_millis(self.inter_sample_delay_ms),
            prune_interval: Duration::from_secs(self.prune_interval_secs),
        }
    }

    /// Count caps and age window for the score store.
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_samples: self.max_samples,
            max_alerts: self.max_alerts,
            window: Duration::from_secs(self.retention_days.saturating_mul(24 * 60 * 60)),
        }
    }
}
