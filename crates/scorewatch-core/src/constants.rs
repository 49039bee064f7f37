//! Retention limits and time windows. All durations are in milliseconds
//! unless stated otherwise.

use std::time::Duration;

/// Milliseconds in one hour.
pub const MS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Milliseconds in one day.
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Maximum score samples retained per user. Oldest samples are dropped first.
pub const MAX_SAMPLES_PER_USER: usize = 100;

/// Maximum alerts retained per user. Oldest alerts are dropped first.
pub const MAX_ALERTS_PER_USER: usize = 50;

/// Age after which samples and alerts are purged regardless of count.
pub const RETENTION_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60); // 30 days

/// Window used by [`crate::store::ScoreStore::user_stats`] for "today" figures.
pub const STATS_WINDOW_MS: i64 = MS_PER_DAY;

/// Window of score changes included per user in an export.
pub const EXPORT_CHANGES_WINDOW_MS: i64 = 7 * MS_PER_DAY;

/// Smallest suspicious increase graded [`crate::types::AlertLevel::High`].
pub const HIGH_LEVEL_DELTA: i64 = 50;

/// Smallest suspicious increase graded [`crate::types::AlertLevel::Medium`].
pub const MEDIUM_LEVEL_DELTA: i64 = 20;

/// Default look-back for suspicious activity listings, in hours.
pub const SUSPICIOUS_LOOKBACK_HOURS: i64 = 72;

/// Largest accepted number of digits in a textual score reading.
pub const MAX_SCORE_DIGITS: usize = 18;

/// Count caps and age window applied by a [`crate::store::ScoreStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Per-user sample cap.
    pub max_samples: usize,
    /// Per-user alert cap.
    pub max_alerts: usize,
    /// Entries older than `now - window` are removed by a prune sweep.
    pub window: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_samples: MAX_SAMPLES_PER_USER,
            max_alerts: MAX_ALERTS_PER_USER,
            window: RETENTION_WINDOW,
        }
    }
}
