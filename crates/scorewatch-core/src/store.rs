//! In-memory score history and alert store.
//!
//! [`ScoreStore`] keeps one [`UserRecord`] per tracked username. Each call to
//! [`ScoreStore::record_sample`] appends a sample, compares it with the
//! previous one through [`rules::evaluate`], and appends an alert when the
//! score rose. Both lists are capped per user by the [`RetentionPolicy`];
//! [`ScoreStore::prune`] removes entries older than the retention window.
//!
//! The store is a plain `&mut self` type. Callers that share it across tasks
//! wrap it in a lock so that read-previous-then-append stays atomic.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::constants::RetentionPolicy;
use crate::error::ScoreError;
use crate::rules;
use crate::types::{AlertKind, AlertRecord, ScoreSample, Timestamp, UserAlert, UserRecord};

/// Counts removed by a [`ScoreStore::prune`] sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub samples_removed: usize,
    pub alerts_removed: usize,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.samples_removed == 0 && self.alerts_removed == 0
    }
}

/// Per-user score history with bounded retention.
#[derive(Debug, Clone, Default)]
pub struct ScoreStore {
    records: HashMap<String, UserRecord>,
    policy: RetentionPolicy,
    /// Sequence number assigned to the next alert.
    next_seq: u64,
}

impl ScoreStore {
    /// Create an empty store with the default retention policy.
    pub fn new() -> Self {
        Self::with_policy(RetentionPolicy::default())
    }

    /// Create an empty store with a custom retention policy.
    pub fn with_policy(policy: RetentionPolicy) -> Self {
        Self {
            records: HashMap::new(),
            policy,
            next_seq: 0,
        }
    }

    /// Rebuild a store from previously persisted records.
    ///
    /// Count caps are re-applied and the alert sequence resumes after the
    /// highest persisted sequence number.
    pub fn from_records(records: HashMap<String, UserRecord>, policy: RetentionPolicy) -> Self {
        let mut store = Self::with_policy(policy);
        for (username, mut record) in records {
            enforce_caps(&mut record, &policy);
            if let Some(seq) = record.max_alert_seq() {
                store.next_seq = store.next_seq.max(seq.saturating_add(1));
            }
            store.records.insert(username, record);
        }
        store
    }

    /// Append a sample for `username` and classify the transition.
    ///
    /// Creates the user's record on first sample. Returns the alert appended
    /// to the user's alert list, if the score rose.
    ///
    /// # Errors
    ///
    /// - [`ScoreError::EmptyUsername`] if `username` is blank
    /// - [`ScoreError::NegativeScore`] if `score < 0`
    ///
    /// Rejected samples leave the store unchanged.
    pub fn record_sample(
        &mut self,
        username: &str,
        score: i64,
        corroborated: bool,
        now: Timestamp,
    ) -> Result<Option<AlertRecord>, ScoreError> {
        let username = normalize_username(username)?;
        let score = u64::try_from(score).map_err(|_| ScoreError::NegativeScore(score))?;
        let policy = self.policy;

        let record = self.records.entry(username.to_string()).or_insert_with(|| {
            debug!(%username, "score_store: new user record");
            UserRecord::new(now)
        });

        let previous = record.latest_sample().map(|s| s.score);
        record.scores.push_back(ScoreSample {
            score,
            corroborated,
            timestamp: now,
        });
        while record.scores.len() > policy.max_samples {
            record.scores.pop_front();
        }

        let Some(verdict) = rules::evaluate(previous, score, corroborated) else {
            debug!(%username, score, ?previous, "score_store: sample recorded, no alert");
            return Ok(None);
        };

        let alert = AlertRecord {
            seq: self.next_seq,
            kind: verdict.kind,
            message: verdict.message(username),
            delta: verdict.delta,
            timestamp: now,
        };
        self.next_seq = self.next_seq.saturating_add(1);

        record.alerts.push_back(alert.clone());
        while record.alerts.len() > policy.max_alerts {
            record.alerts.pop_front();
        }

        match alert.kind {
            AlertKind::Suspicious => {
                warn!(%username, score, delta = alert.delta, "score_store: suspicious increase")
            }
            AlertKind::Normal => {
                info!(%username, score, delta = alert.delta, "score_store: corroborated increase")
            }
        }

        Ok(Some(alert))
    }

    /// Start tracking `username` with an empty record.
    ///
    /// Returns `false` if the username was already tracked.
    pub fn track(&mut self, username: &str, now: Timestamp) -> Result<bool, ScoreError> {
        let username = normalize_username(username)?;
        if self.records.contains_key(username) {
            return Ok(false);
        }
        self.records.insert(username.to_string(), UserRecord::new(now));
        info!(%username, "score_store: tracking user");
        Ok(true)
    }

    /// Remove every sample and alert older than `now - window`.
    ///
    /// An entry stamped exactly at the cutoff is kept. Count caps play no
    /// part here.
    pub fn prune(&mut self, now: Timestamp, window: Duration) -> PruneReport {
        let cutoff = now.saturating_sub(window);
        let mut report = PruneReport::default();

        for record in self.records.values_mut() {
            let samples_before = record.scores.len();
            record.scores.retain(|s| s.timestamp >= cutoff);
            report.samples_removed += samples_before - record.scores.len();

            let alerts_before = record.alerts.len();
            record.alerts.retain(|a| a.timestamp >= cutoff);
            report.alerts_removed += alerts_before - record.alerts.len();
        }

        if !report.is_empty() {
            info!(
                samples = report.samples_removed,
                alerts = report.alerts_removed,
                %cutoff,
                "score_store: pruned old entries"
            );
        }
        report
    }

    /// Up to `limit` alerts across all users, newest first.
    ///
    /// Alerts sharing a timestamp keep their insertion order.
    pub fn recent_alerts(&self, limit: usize) -> Vec<UserAlert> {
        let mut all: Vec<UserAlert> = self
            .records
            .iter()
            .flat_map(|(username, record)| {
                record.alerts.iter().map(move |alert| UserAlert {
                    username: username.clone(),
                    alert: alert.clone(),
                })
            })
            .collect();

        all.sort_by(|a, b| {
            b.alert
                .timestamp
                .cmp(&a.alert.timestamp)
                .then(a.alert.seq.cmp(&b.alert.seq))
        });
        all.truncate(limit);
        all
    }

    /// Delete a user's record. Unknown usernames are a no-op.
    ///
    /// Returns `true` if a record was removed.
    pub fn remove_user(&mut self, username: &str) -> bool {
        let removed = self.records.remove(username.trim()).is_some();
        if removed {
            info!(username = username.trim(), "score_store: user removed");
        }
        removed
    }

    /// Delete every user record.
    pub fn clear(&mut self) {
        let count = self.records.len();
        self.records.clear();
        info!(users = count, "score_store: cleared all users");
    }

    /// Empty every user's alert list, keeping samples.
    ///
    /// Returns the number of alerts removed.
    pub fn clear_alerts(&mut self) -> usize {
        let mut removed = 0;
        for record in self.records.values_mut() {
            removed += record.alerts.len();
            record.alerts.clear();
        }
        info!(alerts = removed, "score_store: cleared all alerts");
        removed
    }

    /// Full history for a user, or `None` if untracked.
    pub fn user(&self, username: &str) -> Option<&UserRecord> {
        self.records.get(username.trim())
    }

    /// A user's samples, oldest first. Empty if untracked.
    pub fn scores(&self, username: &str) -> Vec<ScoreSample> {
        self.user(username)
            .map(|r| r.scores.iter().copied().collect())
            .unwrap_or_default()
    }

    /// A user's alerts, oldest first. Empty if untracked.
    pub fn alerts(&self, username: &str) -> Vec<AlertRecord> {
        self.user(username)
            .map(|r| r.alerts.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Most recent sample for a user.
    pub fn latest_sample(&self, username: &str) -> Option<&ScoreSample> {
        self.user(username).and_then(UserRecord::latest_sample)
    }

    /// Tracked usernames in lexical order.
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn records(&self) -> &HashMap<String, UserRecord> {
        &self.records
    }

    pub fn into_records(self) -> HashMap<String, UserRecord> {
        self.records
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Number of tracked users.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn normalize_username(username: &str) -> Result<&str, ScoreError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ScoreError::EmptyUsername);
    }
    Ok(trimmed)
}

fn enforce_caps(record: &mut UserRecord, policy: &RetentionPolicy) {
    while record.scores.len() > policy.max_samples {
        record.scores.pop_front();
    }
    while record.alerts.len() > policy.max_alerts {
        record.alerts.pop_front();
    }
}
