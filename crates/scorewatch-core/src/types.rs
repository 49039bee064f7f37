//! Score samples, alert records, and per-user history.
//!
//! Every persisted type derives both serde (JSON export) and bincode
//! (RocksDB values). Timestamps are Unix milliseconds.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{HIGH_LEVEL_DELTA, MAX_SCORE_DIGITS, MEDIUM_LEVEL_DELTA};
use crate::error::ScoreError;

/// Instant as Unix milliseconds.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Self = Self(0);

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// `self - duration`, clamped at `i64::MIN`.
    pub fn saturating_sub(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration_millis(duration)))
    }

    /// `self + duration`, clamped at `i64::MAX`.
    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(duration)))
    }

    /// Convert to a chrono UTC datetime. `None` if out of chrono's range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => write!(f, "{}ms", self.0),
        }
    }
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// Classification of a score increase.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// The score rose without a corroborating event marker.
    Suspicious,
    /// The score rose and a corroborating event marker was present.
    Normal,
}

impl AlertKind {
    /// Notification title for this kind.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Suspicious => "Suspicious Activity",
            Self::Normal => "Normal Activity",
        }
    }

    /// Notification severity for this kind.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Suspicious => Severity::Warning,
            Self::Normal => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suspicious => "suspicious",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How large a suspicious increase is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
}

impl AlertLevel {
    /// Grade an increase: `High` from 50, `Medium` from 20, else `Low`.
    pub fn from_delta(delta: i64) -> Self {
        if delta >= HIGH_LEVEL_DELTA {
            Self::High
        } else if delta >= MEDIUM_LEVEL_DELTA {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed score reading.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct ScoreSample {
    pub score: u64,
    /// Whether an independent page marker accompanied the reading.
    pub corroborated: bool,
    pub timestamp: Timestamp,
}

/// An alert derived from a positive score transition.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct AlertRecord {
    /// Store-wide insertion sequence. Breaks timestamp ties.
    pub seq: u64,
    pub kind: AlertKind,
    pub message: String,
    /// Score increase that triggered the alert. Always positive.
    pub delta: i64,
    pub timestamp: Timestamp,
}

/// Full history for one tracked username.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct UserRecord {
    /// When tracking of this username began.
    pub added_at: Timestamp,
    /// Samples in insertion order, oldest first.
    pub scores: VecDeque<ScoreSample>,
    /// Alerts in insertion order, oldest first.
    pub alerts: VecDeque<AlertRecord>,
}

impl UserRecord {
    pub fn new(added_at: Timestamp) -> Self {
        Self {
            added_at,
            scores: VecDeque::new(),
            alerts: VecDeque::new(),
        }
    }

    /// Most recently inserted sample.
    pub fn latest_sample(&self) -> Option<&ScoreSample> {
        self.scores.back()
    }

    /// Highest alert sequence number in this record.
    pub fn max_alert_seq(&self) -> Option<u64> {
        self.alerts.iter().map(|a| a.seq).max()
    }
}

/// An alert paired with the username that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAlert {
    pub username: String,
    pub alert: AlertRecord,
}

/// A raw reading handed over by a sampler, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReading {
    pub username: String,
    pub score: i64,
    pub corroborated: bool,
}

impl ScoreReading {
    /// Build a reading from the textual score shown on a page.
    pub fn from_text(
        username: impl Into<String>,
        text: &str,
        corroborated: bool,
    ) -> Result<Self, ScoreError> {
        Ok(Self {
            username: username.into(),
            score: Self::parse_score(text)?,
            corroborated,
        })
    }

    /// Parse a textual score such as `"12,345"` or `"1 024"`.
    ///
    /// Digit group separators (`,`, `_`, whitespace) are ignored. Any other
    /// character makes the reading non-numeric. A leading `-` yields
    /// [`ScoreError::NegativeScore`] for non-zero values.
    pub fn parse_score(text: &str) -> Result<i64, ScoreError> {
        let trimmed = text.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let mut digits = String::with_capacity(body.len());
        for c in body.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ',' | '_' => {}
                c if c.is_whitespace() => {}
                _ => return Err(ScoreError::NonNumeric(text.to_string())),
            }
        }

        if digits.is_empty() || digits.len() > MAX_SCORE_DIGITS {
            return Err(ScoreError::NonNumeric(text.to_string()));
        }

        let value: i64 = digits
            .parse()
            .map_err(|_| ScoreError::NonNumeric(text.to_string()))?;

        if negative && value != 0 {
            return Err(ScoreError::NegativeScore(-value));
        }
        Ok(value)
    }
}
