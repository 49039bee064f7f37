//! Notification routing and delivery.
//!
//! Both alert kinds are always stored; [`NotifyPolicy`] decides which of them
//! reach the [`Notifier`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use scorewatch_core::traits::{Notification, Notifier};
use scorewatch_core::types::{AlertKind, Severity};

/// Which alert kinds are forwarded to the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Only suspicious increases.
    #[default]
    SuspiciousOnly,
    /// Suspicious and corroborated increases.
    All,
    /// Nothing; alerts are stored and logged only.
    Silent,
}

impl NotifyPolicy {
    pub fn allows(&self, kind: AlertKind) -> bool {
        match self {
            Self::SuspiciousOnly => kind == AlertKind::Suspicious,
            Self::All => true,
            Self::Silent => false,
        }
    }
}

impl fmt::Display for NotifyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuspiciousOnly => f.write_str("suspicious_only"),
            Self::All => f.write_str("all"),
            Self::Silent => f.write_str("silent"),
        }
    }
}

impl FromStr for NotifyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "suspicious_only" | "suspicious" => Ok(Self::SuspiciousOnly),
            "all" => Ok(Self::All),
            "silent" | "none" => Ok(Self::Silent),
            other => Err(format!("unknown notify policy: {other}")),
        }
    }
}

/// Writes notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str, severity: Severity) {
        match severity {
            Severity::Warning => warn!(title = %title, "notification: {message}"),
            Severity::Info => info!(title = %title, "notification: {message}"),
        }
    }
}

/// Forwards notifications over an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, title: &str, message: &str, severity: Severity) {
        let notification = Notification {
            title: title.to_string(),
            message: message.to_string(),
            severity,
        };
        if self.tx.send(notification).is_err() {
            debug!("notification receiver dropped; discarding");
        }
    }
}
