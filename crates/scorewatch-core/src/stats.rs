//! Derived views over a [`ScoreStore`]: score changes, per-user stats,
//! suspicious activity, and the JSON export document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{EXPORT_CHANGES_WINDOW_MS, STATS_WINDOW_MS};
use crate::store::ScoreStore;
use crate::types::{AlertKind, AlertLevel, AlertRecord, ScoreSample, Timestamp, UserRecord};

/// A positive transition between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreChange {
    /// Timestamp of the later sample.
    pub timestamp: Timestamp,
    /// Score of the later sample.
    pub score: u64,
    /// Increase over the previous sample.
    pub change: i64,
    /// Whether the later sample was corroborated.
    pub corroborated: bool,
}

/// A suspicious alert with its graded level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    pub username: String,
    pub level: AlertLevel,
    pub alert: AlertRecord,
}

/// Summary of one user's recent activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub username: String,
    pub current_score: u64,
    pub last_updated: Timestamp,
    /// Number of increases in the stats window.
    pub changes_today: usize,
    /// Sum of increases in the stats window.
    pub total_change_today: i64,
    /// Latest score minus the earliest score inside the stats window.
    pub daily_change: i64,
    /// Whether the latest sample carried a corroborating marker.
    pub corroborated_latest: bool,
    pub samples: usize,
    pub suspicious_alerts: usize,
    pub normal_alerts: usize,
}

/// Per-user section of an [`ExportDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserExport {
    pub added_at: Timestamp,
    pub scores: Vec<ScoreSample>,
    pub alerts: Vec<AlertRecord>,
    pub recent_changes: Vec<ScoreChange>,
    pub stats: Option<UserStats>,
}

/// Snapshot of the whole store for external consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub export_date: Timestamp,
    pub users: BTreeMap<String, UserExport>,
}

/// Positive transitions whose later sample is at or after `since`.
pub fn score_changes(record: &UserRecord, since: Timestamp) -> Vec<ScoreChange> {
    record
        .scores
        .iter()
        .zip(record.scores.iter().skip(1))
        .filter(|(_, cur)| cur.timestamp >= since)
        .filter_map(|(prev, cur)| {
            (cur.score > prev.score).then(|| ScoreChange {
                timestamp: cur.timestamp,
                score: cur.score,
                change: signed_diff(cur.score, prev.score),
                corroborated: cur.corroborated,
            })
        })
        .collect()
}

/// Stats for `username` as of `now`. `None` if it has no samples.
pub fn user_stats(username: &str, record: &UserRecord, now: Timestamp) -> Option<UserStats> {
    let latest = record.latest_sample()?;
    let since = Timestamp::from_millis(now.as_millis().saturating_sub(STATS_WINDOW_MS));

    let changes = score_changes(record, since);
    let baseline = record
        .scores
        .iter()
        .find(|s| s.timestamp >= since)
        .unwrap_or(latest);

    let count_kind =
        |kind: AlertKind| record.alerts.iter().filter(|a| a.kind == kind).count();

    Some(UserStats {
        username: username.to_string(),
        current_score: latest.score,
        last_updated: latest.timestamp,
        changes_today: changes.len(),
        total_change_today: changes
            .iter()
            .fold(0i64, |acc, c| acc.saturating_add(c.change)),
        daily_change: signed_diff(latest.score, baseline.score),
        corroborated_latest: latest.corroborated,
        samples: record.scores.len(),
        suspicious_alerts: count_kind(AlertKind::Suspicious),
        normal_alerts: count_kind(AlertKind::Normal),
    })
}

fn signed_diff(a: u64, b: u64) -> i64 {
    let diff = i128::from(a) - i128::from(b);
    i64::try_from(diff).unwrap_or(if diff > 0 { i64::MAX } else { i64::MIN })
}

impl ScoreStore {
    /// Positive transitions for `username` at or after `since`.
    pub fn score_changes(&self, username: &str, since: Timestamp) -> Vec<ScoreChange> {
        self.user(username)
            .map(|record| score_changes(record, since))
            .unwrap_or_default()
    }

    /// Suspicious alerts at or after `since` across all users, newest first,
    /// each graded by the size of its increase.
    pub fn suspicious_activity(&self, since: Timestamp) -> Vec<SuspiciousActivity> {
        self.recent_alerts(usize::MAX)
            .into_iter()
            .filter(|ua| ua.alert.kind == AlertKind::Suspicious && ua.alert.timestamp >= since)
            .map(|ua| SuspiciousActivity {
                level: AlertLevel::from_delta(ua.alert.delta),
                username: ua.username,
                alert: ua.alert,
            })
            .collect()
    }

    /// Stats for one user as of `now`.
    pub fn user_stats(&self, username: &str, now: Timestamp) -> Option<UserStats> {
        let record = self.user(username)?;
        user_stats(username.trim(), record, now)
    }

    /// Export every user's history, recent changes, and stats.
    pub fn export(&self, now: Timestamp) -> ExportDocument {
        let changes_since =
            Timestamp::from_millis(now.as_millis().saturating_sub(EXPORT_CHANGES_WINDOW_MS));

        let users = self
            .records()
            .iter()
            .map(|(username, record)| {
                let export = UserExport {
                    added_at: record.added_at,
                    scores: record.scores.iter().copied().collect(),
                    alerts: record.alerts.iter().cloned().collect(),
                    recent_changes: score_changes(record, changes_since),
                    stats: user_stats(username, record, now),
                };
                (username.clone(), export)
            })
            .collect();

        ExportDocument {
            export_date: now,
            users,
        }
    }
}
