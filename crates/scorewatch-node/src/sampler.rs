//! Score sampler adapters.
//!
//! Extracting a score from a live page is environment-specific, so the
//! tracker only sees the [`ScoreSampler`] trait. [`SnapshotFileSampler`]
//! reads readings that an external scraper writes to a JSON file;
//! [`FixedSampler`] replays scripted readings.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use scorewatch_core::error::{ScoreError, WatchError};
use scorewatch_core::types::ScoreReading;

/// Source of score readings for tracked usernames.
#[async_trait]
pub trait ScoreSampler: Send {
    /// Read the current score for `username`.
    ///
    /// `Ok(None)` means the user was not visible this pass. Retrying a
    /// failed read is up to the implementation.
    async fn sample(&mut self, username: &str) -> Result<Option<ScoreReading>, WatchError>;
}

/// One user's entry in a snapshot file.
#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    /// Number or display text such as `"12,345"`.
    score: Value,
    #[serde(default)]
    corroborated: bool,
}

/// Reads `{ "<username>": { "score": .., "corroborated": .. }, .. }` from a
/// JSON file on every call.
#[derive(Debug, Clone)]
pub struct SnapshotFileSampler {
    path: PathBuf,
}

impl SnapshotFileSampler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse_entry(username: &str, entry: &SnapshotEntry) -> Result<ScoreReading, ScoreError> {
        let score = match &entry.score {
            Value::Number(n) => match n.as_i64() {
                Some(v) => v,
                None => return Err(ScoreError::NonNumeric(n.to_string())),
            },
            Value::String(text) => ScoreReading::parse_score(text)?,
            other => return Err(ScoreError::NonNumeric(other.to_string())),
        };
        Ok(ScoreReading {
            username: username.to_string(),
            score,
            corroborated: entry.corroborated,
        })
    }
}

#[async_trait]
impl ScoreSampler for SnapshotFileSampler {
    async fn sample(&mut self, username: &str) -> Result<Option<ScoreReading>, WatchError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| WatchError::Sampler(format!("{}: {e}", self.path.display())))?;
        let mut entries: HashMap<String, SnapshotEntry> = serde_json::from_str(&contents)
            .map_err(|e| WatchError::Sampler(format!("{}: {e}", self.path.display())))?;

        match entries.remove(username) {
            Some(entry) => Ok(Some(Self::parse_entry(username, &entry)?)),
            None => Ok(None),
        }
    }
}

/// One scripted outcome for [`FixedSampler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    Reading { score: i64, corroborated: bool },
    Missing,
    Failure(String),
}

/// Replays queued outcomes per username. An exhausted queue yields `Ok(None)`.
#[derive(Debug, Clone, Default)]
pub struct FixedSampler {
    queues: HashMap<String, VecDeque<Scripted>>,
}

impl FixedSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, username: &str, score: i64, corroborated: bool) -> &mut Self {
        self.push_outcome(username, Scripted::Reading { score, corroborated })
    }

    pub fn push_outcome(&mut self, username: &str, outcome: Scripted) -> &mut Self {
        self.queues
            .entry(username.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Outcomes not yet consumed, across all users.
    pub fn remaining(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl ScoreSampler for FixedSampler {
    async fn sample(&mut self, username: &str) -> Result<Option<ScoreReading>, WatchError> {
        let next = self
            .queues
            .get_mut(username)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Scripted::Reading { score, corroborated }) => Ok(Some(ScoreReading {
                username: username.to_string(),
                score,
                corroborated,
            })),
            Some(Scripted::Failure(msg)) => Err(WatchError::Sampler(msg)),
            Some(Scripted::Missing) | None => Ok(None),
        }
    }
}
