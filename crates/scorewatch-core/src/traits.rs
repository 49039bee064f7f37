//! Collaborator interfaces for scorewatch.
//!
//! These traits define the seams between the store and its host:
//! - [`Clock`]: source of "now" (system clock, or manual in tests)
//! - [`RecordStore`]: durable persistence of the per-user mapping
//!   (scorewatch-node implements it with RocksDB)
//! - [`Notifier`]: fire-and-forget alert delivery

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use crate::error::WatchError;
use crate::types::{Severity, Timestamp, UserRecord};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time via chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.as_millis()),
        }
    }

    pub fn set(&self, to: Timestamp) {
        self.millis.store(to.as_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Durable storage for the username → [`UserRecord`] mapping.
///
/// Not thread-safe; callers should wrap in a `Mutex` if concurrent access
/// is needed.
pub trait RecordStore: Send + Sync {
    /// Load every persisted record.
    fn load_all(&self) -> Result<HashMap<String, UserRecord>, WatchError>;

    /// Insert or replace a single user's record.
    fn save_user(&mut self, username: &str, record: &UserRecord) -> Result<(), WatchError>;

    /// Replace the persisted mapping with `records` in one step.
    ///
    /// Users absent from `records` are deleted.
    fn save_all(&mut self, records: &HashMap<String, UserRecord>) -> Result<(), WatchError>;

    /// Delete one user's record. Unknown usernames are not an error.
    fn delete_user(&mut self, username: &str) -> Result<(), WatchError>;

    /// Delete every record.
    fn clear(&mut self) -> Result<(), WatchError>;

    /// Remember when the last retention sweep ran.
    fn set_last_prune(&mut self, at: Timestamp) -> Result<(), WatchError>;

    /// When the last retention sweep ran, if ever.
    fn last_prune(&self) -> Result<Option<Timestamp>, WatchError>;
}

/// In-memory record storage for testing.
///
/// No persistence across process restarts.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    records: HashMap<String, UserRecord>,
    last_prune: Option<Timestamp>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, username: &str) -> Option<&UserRecord> {
        self.records.get(username)
    }
}

impl RecordStore for MemoryRecordStore {
    fn load_all(&self) -> Result<HashMap<String, UserRecord>, WatchError> {
        Ok(self.records.clone())
    }

    fn save_user(&mut self, username: &str, record: &UserRecord) -> Result<(), WatchError> {
        self.records.insert(username.to_string(), record.clone());
        Ok(())
    }

    fn save_all(&mut self, records: &HashMap<String, UserRecord>) -> Result<(), WatchError> {
        self.records = records.clone();
        Ok(())
    }

    fn delete_user(&mut self, username: &str) -> Result<(), WatchError> {
        self.records.remove(username);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), WatchError> {
        self.records.clear();
        Ok(())
    }

    fn set_last_prune(&mut self, at: Timestamp) -> Result<(), WatchError> {
        self.last_prune = Some(at);
        Ok(())
    }

    fn last_prune(&self) -> Result<Option<Timestamp>, WatchError> {
        Ok(self.last_prune)
    }
}

/// A notification as delivered to a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

/// Fire-and-forget alert delivery. Implementations must not block and
/// must swallow their own delivery failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str, severity: Severity);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _message: &str, _severity: Severity) {}
}
