//! Tracker: the score store composed with its collaborators.
//!
//! [`Tracker`] owns the in-memory [`ScoreStore`] behind a mutex so that each
//! read-previous-then-append is atomic, persists every change through a
//! [`RecordStore`], and forwards alerts to a [`Notifier`] according to the
//! configured [`NotifyPolicy`]. [`Tracker::run`] drives periodic sampling and
//! retention sweeps until shutdown is signalled.
//!
//! Lock order is always store, then persistence.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use scorewatch_core::constants::RetentionPolicy;
use scorewatch_core::error::WatchError;
use scorewatch_core::store::{PruneReport, ScoreStore};
use scorewatch_core::traits::{Clock, Notifier, RecordStore};
use scorewatch_core::types::{AlertRecord, ScoreReading, Timestamp, UserAlert, UserRecord};

use crate::config::WatchConfig;
use crate::notify::NotifyPolicy;
use crate::sampler::ScoreSampler;

/// Timer settings for [`Tracker::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    /// Time between sampling passes.
    pub sample_interval: Duration,
    /// Pause between two users within a pass.
    pub inter_sample_delay: Duration,
    /// Time between retention sweeps.
    pub prune_interval: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(5 * 60),
            inter_sample_delay: Duration::from_secs(2),
            prune_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// What a persist call must write.
enum Scope<'a> {
    User(&'a str),
    All,
}

struct Inner {
    store: ScoreStore,
    /// Set when a persist failed; the next persist rewrites everything.
    dirty: bool,
}

/// Score store plus persistence, notification, and clock.
pub struct Tracker {
    inner: Mutex<Inner>,
    persistence: Mutex<Box<dyn RecordStore>>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    policy: NotifyPolicy,
}

impl Tracker {
    /// Load every persisted record and build a tracker around it.
    pub fn open(
        persistence: Box<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        policy: NotifyPolicy,
        retention: RetentionPolicy,
    ) -> Result<Self, WatchError> {
        let records = persistence.load_all()?;
        let store = ScoreStore::from_records(records, retention);
        info!(users = store.len(), %policy, "tracker: opened");

        Ok(Self {
            inner: Mutex::new(Inner { store, dirty: false }),
            persistence: Mutex::new(persistence),
            notifier,
            clock,
            policy,
        })
    }

    /// Open with settings from `config` and start tracking its
    /// `tracked_users`.
    pub fn from_config(
        config: &WatchConfig,
        persistence: Box<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WatchError> {
        let tracker = Self::open(
            persistence,
            notifier,
            clock,
            config.notify,
            config.retention(),
        )?;
        for username in &config.tracked_users {
            tracker.track(username)?;
        }
        Ok(tracker)
    }

    /// Record a sampler reading and dispatch any resulting alert.
    ///
    /// An invalid reading leaves every state untouched. If only the persist
    /// step fails, the sample stays recorded in memory, the alert is still
    /// dispatched, and the storage error is returned.
    pub fn record(&self, reading: &ScoreReading) -> Result<Option<AlertRecord>, WatchError> {
        let (alert, persisted) = {
            let mut inner = self.inner.lock();
            // Read under the lock so stored samples stay in timestamp order.
            let now = self.clock.now();
            let alert = inner.store.record_sample(
                &reading.username,
                reading.score,
                reading.corroborated,
                now,
            )?;
            let persisted = self.persist(&mut inner, Scope::User(reading.username.trim()));
            (alert, persisted)
        };

        if let Some(alert) = &alert {
            self.dispatch(alert);
        }
        persisted?;
        Ok(alert)
    }

    /// Start tracking `username`. Returns `false` if it was already tracked.
    pub fn track(&self, username: &str) -> Result<bool, WatchError> {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        let added = inner.store.track(username, now)?;
        if added {
            self.persist(&mut inner, Scope::User(username.trim()))?;
        }
        Ok(added)
    }

    /// Stop tracking `username` and delete its history.
    ///
    /// Unknown usernames are a no-op and return `false`.
    pub fn remove_user(&self, username: &str) -> Result<bool, WatchError> {
        let mut inner = self.inner.lock();
        let removed = inner.store.remove_user(username);
        if removed {
            self.persist(&mut inner, Scope::User(username.trim()))?;
        }
        Ok(removed)
    }

    /// Delete every user and all their history.
    pub fn clear(&self) -> Result<(), WatchError> {
        let mut inner = self.inner.lock();
        inner.store.clear();
        let result = self.persistence.lock().clear();
        inner.dirty = result.is_err();
        result
    }

    /// Empty every alert list, keeping samples. Returns the number removed.
    pub fn clear_alerts(&self) -> Result<usize, WatchError> {
        let mut inner = self.inner.lock();
        let removed = inner.store.clear_alerts();
        if removed > 0 {
            self.persist(&mut inner, Scope::All)?;
        }
        Ok(removed)
    }

    /// Drop samples and alerts older than the retention window.
    pub fn prune(&self) -> Result<PruneReport, WatchError> {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        let window = inner.store.policy().window;
        let report = inner.store.prune(now, window);
        if !report.is_empty() {
            self.persist(&mut inner, Scope::All)?;
        }
        self.persistence.lock().set_last_prune(now)?;
        Ok(report)
    }

    /// Up to `limit` alerts across all users, newest first.
    pub fn recent_alerts(&self, limit: usize) -> Vec<UserAlert> {
        self.inner.lock().store.recent_alerts(limit)
    }

    /// Copy of a user's full history.
    pub fn user(&self, username: &str) -> Option<UserRecord> {
        self.inner.lock().store.user(username).cloned()
    }

    /// Tracked usernames in lexical order.
    pub fn usernames(&self) -> Vec<String> {
        self.inner.lock().store.usernames()
    }

    /// Run a read-only closure against the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&ScoreStore) -> R) -> R {
        f(&self.inner.lock().store)
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn last_prune(&self) -> Result<Option<Timestamp>, WatchError> {
        self.persistence.lock().last_prune()
    }

    /// Whether a previous persist failed and has not been retried yet.
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }

    /// Retry a failed persist, if any.
    pub fn flush(&self) -> Result<(), WatchError> {
        let mut inner = self.inner.lock();
        if inner.dirty {
            self.persist(&mut inner, Scope::All)?;
        }
        Ok(())
    }

    /// Sample every tracked user each `sample_interval` and prune each
    /// `prune_interval` until `shutdown` turns `true` or its sender drops.
    ///
    /// Both timers fire once immediately. Failures are logged and the loop
    /// carries on.
    pub async fn run<S: ScoreSampler + ?Sized>(
        &self,
        sampler: &mut S,
        cadence: Cadence,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut sample_tick = tokio::time::interval(cadence.sample_interval);
        sample_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut prune_tick = tokio::time::interval(cadence.prune_interval);
        prune_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            sample_secs = cadence.sample_interval.as_secs(),
            prune_secs = cadence.prune_interval.as_secs(),
            "tracker: loop started"
        );

        let stopped = *shutdown.borrow();
        if !stopped {
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = prune_tick.tick() => {
                        match self.prune() {
                            Ok(report) => debug!(
                                samples = report.samples_removed,
                                alerts = report.alerts_removed,
                                "tracker: prune sweep done"
                            ),
                            Err(e) => warn!("tracker: prune failed: {e}"),
                        }
                    }
                    _ = sample_tick.tick() => {
                        let delay = cadence.inter_sample_delay;
                        if !self.sample_pass(sampler, delay, &mut shutdown).await {
                            break;
                        }
                    }
                }
            }
        }

        if let Err(e) = self.flush() {
            warn!("tracker: final flush failed: {e}");
        }
        info!("tracker: loop stopped");
    }

    /// One sampling pass over all tracked users. Returns `false` if shutdown
    /// arrived mid-pass.
    async fn sample_pass<S: ScoreSampler + ?Sized>(
        &self,
        sampler: &mut S,
        delay: Duration,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let usernames = self.usernames();
        debug!(users = usernames.len(), "tracker: sampling pass");

        for (i, username) in usernames.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            return false;
                        }
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            match sampler.sample(username).await {
                Ok(Some(reading)) => {
                    if let Err(e) = self.record(&reading) {
                        warn!(%username, "tracker: reading not recorded: {e}");
                    }
                }
                Ok(None) => debug!(%username, "tracker: no reading this pass"),
                Err(e) => warn!(%username, "tracker: sample failed: {e}"),
            }
        }
        true
    }

    fn dispatch(&self, alert: &AlertRecord) {
        if self.policy.allows(alert.kind) {
            self.notifier
                .notify(alert.kind.title(), &alert.message, alert.kind.severity());
        } else {
            debug!(kind = %alert.kind, "tracker: notification suppressed by policy");
        }
    }

    fn persist(&self, inner: &mut Inner, scope: Scope<'_>) -> Result<(), WatchError> {
        let mut persistence = self.persistence.lock();
        let result = match scope {
            _ if inner.dirty => persistence.save_all(inner.store.records()),
            Scope::All => persistence.save_all(inner.store.records()),
            Scope::User(username) => match inner.store.user(username) {
                Some(record) => persistence.save_user(username, record),
                None => persistence.delete_user(username),
            },
        };

        match result {
            Ok(()) => {
                if inner.dirty {
                    info!("tracker: persistence recovered");
                }
                inner.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!("tracker: persist failed, will rewrite all records next time: {e}");
                inner.dirty = true;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use scorewatch_core::constants::MS_PER_DAY;
    use scorewatch_core::error::ScoreError;
    use scorewatch_core::traits::{ManualClock, MemoryRecordStore, Notification, NullNotifier};
    use scorewatch_core::types::{AlertKind, Severity};
    use tokio::sync::mpsc;

    use crate::notify::ChannelNotifier;
    use crate::sampler::{FixedSampler, Scripted};

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Memory store shared with the test, with a switch to fail writes.
    #[derive(Clone, Default)]
    struct SharedStore {
        inner: Arc<Mutex<MemoryRecordStore>>,
        fail: Arc<AtomicBool>,
        save_all_calls: Arc<AtomicUsize>,
    }

    impl SharedStore {
        fn check(&self) -> Result<(), WatchError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(WatchError::Storage("disk full".into()))
            } else {
                Ok(())
            }
        }
    }

    impl RecordStore for SharedStore {
        fn load_all(&self) -> Result<HashMap<String, UserRecord>, WatchError> {
            self.inner.lock().load_all()
        }
        fn save_user(&mut self, username: &str, record: &UserRecord) -> Result<(), WatchError> {
            self.check()?;
            self.inner.lock().save_user(username, record)
        }
        fn save_all(&mut self, records: &HashMap<String, UserRecord>) -> Result<(), WatchError> {
            self.check()?;
            self.save_all_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.lock().save_all(records)
        }
        fn delete_user(&mut self, username: &str) -> Result<(), WatchError> {
            self.check()?;
            self.inner.lock().delete_user(username)
        }
        fn clear(&mut self) -> Result<(), WatchError> {
            self.check()?;
            self.inner.lock().clear()
        }
        fn set_last_prune(&mut self, at: Timestamp) -> Result<(), WatchError> {
            self.check()?;
            self.inner.lock().set_last_prune(at)
        }
        fn last_prune(&self) -> Result<Option<Timestamp>, WatchError> {
            self.inner.lock().last_prune()
        }
    }

    const START: Timestamp = Timestamp(1_700_000_000_000);

    struct Harness {
        tracker: Arc<Tracker>,
        store: SharedStore,
        clock: Arc<ManualClock>,
        rx: mpsc::UnboundedReceiver<Notification>,
    }

    fn harness(policy: NotifyPolicy) -> Harness {
        let store = SharedStore::default();
        let clock = Arc::new(ManualClock::new(START));
        let (notifier, rx) = ChannelNotifier::new();
        let tracker = Tracker::open(
            Box::new(store.clone()),
            Arc::new(notifier),
            clock.clone(),
            policy,
            RetentionPolicy::default(),
        )
        .unwrap();
        Harness {
            tracker: Arc::new(tracker),
            store,
            clock,
            rx,
        }
    }

    fn reading(username: &str, score: i64, corroborated: bool) -> ScoreReading {
        ScoreReading {
            username: username.to_string(),
            score,
            corroborated,
        }
    }

    fn fast_cadence() -> Cadence {
        Cadence {
            sample_interval: Duration::from_millis(10),
            inter_sample_delay: Duration::ZERO,
            prune_interval: Duration::from_secs(3600),
        }
    }

    // ------------------------------------------------------------------
    // Direct operations
    // ------------------------------------------------------------------

    #[test]
    fn record_persists_and_notifies_suspicious() {
        let mut h = harness(NotifyPolicy::SuspiciousOnly);

        assert!(h.tracker.record(&reading("alice", 100, false)).unwrap().is_none());
        h.clock.advance(Duration::from_secs(60));
        let alert = h.tracker.record(&reading("alice", 150, false)).unwrap().unwrap();
        assert_eq!(alert.kind, AlertKind::Suspicious);
        assert_eq!(alert.delta, 50);

        let note = h.rx.try_recv().unwrap();
        assert_eq!(note.title, "Suspicious Activity");
        assert_eq!(note.severity, Severity::Warning);
        assert!(h.rx.try_recv().is_err());

        let persisted = h.store.inner.lock().get("alice").cloned().unwrap();
        assert_eq!(persisted.scores.len(), 2);
        assert_eq!(persisted.alerts.len(), 1);
    }

    #[test]
    fn normal_alert_follows_policy() {
        let mut quiet = harness(NotifyPolicy::SuspiciousOnly);
        quiet.tracker.record(&reading("bob", 1, true)).unwrap();
        let alert = quiet.tracker.record(&reading("bob", 2, true)).unwrap().unwrap();
        assert_eq!(alert.kind, AlertKind::Normal);
        assert!(quiet.rx.try_recv().is_err());
        // Stored regardless of routing.
        assert_eq!(quiet.tracker.recent_alerts(10).len(), 1);

        let mut loud = harness(NotifyPolicy::All);
        loud.tracker.record(&reading("bob", 1, true)).unwrap();
        loud.tracker.record(&reading("bob", 2, true)).unwrap();
        assert_eq!(loud.rx.try_recv().unwrap().title, "Normal Activity");
    }

    #[test]
    fn invalid_reading_changes_nothing() {
        let h = harness(NotifyPolicy::All);
        match h.tracker.record(&reading("alice", -5, false)) {
            Err(WatchError::Score(ScoreError::NegativeScore(-5))) => {}
            other => panic!("expected negative score error, got {other:?}"),
        }
        assert!(h.tracker.usernames().is_empty());
        assert!(h.store.inner.lock().is_empty());
    }

    #[test]
    fn persist_failure_keeps_memory_and_rewrites_all_later() {
        let mut h = harness(NotifyPolicy::SuspiciousOnly);
        h.tracker.record(&reading("alice", 10, false)).unwrap();

        h.store.fail.store(true, Ordering::SeqCst);
        let err = h.tracker.record(&reading("alice", 20, false)).unwrap_err();
        assert!(matches!(err, WatchError::Storage(_)));
        assert!(h.tracker.is_dirty());
        // Memory is authoritative and the alert still went out.
        assert_eq!(h.tracker.user("alice").unwrap().scores.len(), 2);
        assert!(h.rx.try_recv().is_ok());
        assert_eq!(h.store.inner.lock().get("alice").unwrap().scores.len(), 1);

        h.store.fail.store(false, Ordering::SeqCst);
        h.tracker.record(&reading("bob", 1, false)).unwrap();
        assert!(!h.tracker.is_dirty());
        assert_eq!(h.store.save_all_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.inner.lock().get("alice").unwrap().scores.len(), 2);
        assert!(h.store.inner.lock().get("bob").is_some());
    }

    #[test]
    fn flush_retries_only_when_dirty() {
        let h = harness(NotifyPolicy::Silent);
        h.tracker.flush().unwrap();
        assert_eq!(h.store.save_all_calls.load(Ordering::SeqCst), 0);

        h.store.fail.store(true, Ordering::SeqCst);
        assert!(h.tracker.track("carol").is_err());
        h.store.fail.store(false, Ordering::SeqCst);
        h.tracker.flush().unwrap();
        assert_eq!(h.store.save_all_calls.load(Ordering::SeqCst), 1);
        assert!(h.store.inner.lock().get("carol").is_some());
    }

    #[test]
    fn reopen_resumes_history() {
        let h = harness(NotifyPolicy::Silent);
        h.tracker.record(&reading("alice", 1, false)).unwrap();
        h.tracker.record(&reading("alice", 2, false)).unwrap();

        let reopened = Tracker::open(
            Box::new(h.store.clone()),
            Arc::new(NullNotifier),
            h.clock.clone(),
            NotifyPolicy::Silent,
            RetentionPolicy::default(),
        )
        .unwrap();
        let alert = reopened.record(&reading("alice", 3, false)).unwrap().unwrap();
        assert_eq!(alert.delta, 1);
        assert_eq!(alert.seq, 1);
        assert_eq!(reopened.user("alice").unwrap().scores.len(), 3);
    }

    #[test]
    fn prune_removes_old_entries_and_stamps_time() {
        let h = harness(NotifyPolicy::Silent);
        h.tracker.record(&reading("alice", 1, false)).unwrap();
        h.tracker.record(&reading("alice", 2, false)).unwrap();

        h.clock.advance(Duration::from_millis((31 * MS_PER_DAY) as u64));
        h.tracker.record(&reading("alice", 3, false)).unwrap();

        let report = h.tracker.prune().unwrap();
        assert_eq!(report.samples_removed, 2);
        assert_eq!(report.alerts_removed, 1);
        assert_eq!(h.tracker.last_prune().unwrap(), Some(h.clock.now()));

        let persisted = h.store.inner.lock().get("alice").cloned().unwrap();
        assert_eq!(persisted.scores.len(), 1);
        assert_eq!(persisted.alerts.len(), 1);
    }

    #[test]
    fn remove_track_and_clear() {
        let h = harness(NotifyPolicy::Silent);
        assert!(h.tracker.track("alice").unwrap());
        assert!(!h.tracker.track(" alice ").unwrap());
        assert!(h.tracker.track("   ").is_err());
        h.tracker.record(&reading("bob", 5, false)).unwrap();

        assert!(h.tracker.remove_user("alice").unwrap());
        assert!(!h.tracker.remove_user("nobody").unwrap());
        assert!(h.store.inner.lock().get("alice").is_none());

        h.tracker.clear().unwrap();
        assert!(h.tracker.usernames().is_empty());
        assert!(h.store.inner.lock().is_empty());
    }

    #[test]
    fn from_config_tracks_configured_users() {
        let config = WatchConfig {
            tracked_users: vec!["alice".into(), "bob".into()],
            notify: NotifyPolicy::All,
            ..WatchConfig::default()
        };
        let tracker = Tracker::from_config(
            &config,
            Box::new(MemoryRecordStore::new()),
            Arc::new(NullNotifier),
            Arc::new(ManualClock::new(START)),
        )
        .unwrap();
        assert_eq!(tracker.usernames(), vec!["alice", "bob"]);
    }

    /// Clock that moves forward one millisecond on every read.
    struct TickingClock(std::sync::atomic::AtomicI64);

    impl Clock for TickingClock {
        fn now(&self) -> Timestamp {
            Timestamp::from_millis(self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[test]
    fn concurrent_records_keep_timestamp_order() {
        let clock = Arc::new(TickingClock(START.as_millis().into()));
        let tracker = Tracker::open(
            Box::new(MemoryRecordStore::new()),
            Arc::new(NullNotifier),
            clock,
            NotifyPolicy::Silent,
            RetentionPolicy::default(),
        )
        .unwrap();

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let tracker = &tracker;
                scope.spawn(move || {
                    for i in 0..20 {
                        let score = worker * 100 + i;
                        tracker.record(&reading("alice", score, false)).unwrap();
                    }
                });
            }
        });

        let scores = tracker.user("alice").unwrap().scores;
        assert_eq!(scores.len(), 80);
        let ordered = scores
            .iter()
            .zip(scores.iter().skip(1))
            .all(|(a, b)| a.timestamp < b.timestamp);
        assert!(ordered);
    }

    // ------------------------------------------------------------------
    // Loop
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn run_samples_until_shutdown() {
        let mut h = harness(NotifyPolicy::All);
        h.tracker.track("alice").unwrap();
        h.tracker.track("bob").unwrap();

        let mut sampler = FixedSampler::new();
        sampler.push("alice", 10, false).push("alice", 25, false);
        sampler
            .push_outcome("bob", Scripted::Failure("page not loaded".into()))
            .push("bob", 7, true)
            .push("bob", 9, true);

        let (tx, rx) = watch::channel(false);
        let tracker = Arc::clone(&h.tracker);
        let task = tokio::spawn(async move {
            tracker.run(&mut sampler, fast_cadence(), rx).await;
            sampler
        });

        let mut titles = Vec::new();
        for _ in 0..2 {
            let note = tokio::time::timeout(Duration::from_secs(5), h.rx.recv())
                .await
                .expect("notification in time")
                .expect("channel open");
            titles.push(note.title);
        }
        titles.sort();
        assert_eq!(titles, vec!["Normal Activity", "Suspicious Activity"]);

        tx.send(true).unwrap();
        let sampler = task.await.unwrap();
        assert_eq!(sampler.remaining(), 0);
        assert_eq!(h.tracker.user("alice").unwrap().scores.len(), 2);
        assert_eq!(h.tracker.user("bob").unwrap().scores.len(), 2);
        assert!(h.tracker.last_prune().unwrap().is_some());
    }

    #[tokio::test]
    async fn run_returns_immediately_when_already_shut_down() {
        let h = harness(NotifyPolicy::All);
        h.tracker.track("alice").unwrap();
        let mut sampler = FixedSampler::new();
        sampler.push("alice", 1, false);

        let (_tx, rx) = watch::channel(true);
        h.tracker.run(&mut sampler, fast_cadence(), rx).await;
        assert_eq!(sampler.remaining(), 1);
    }

    #[tokio::test]
    async fn run_stops_when_sender_dropped() {
        let h = harness(NotifyPolicy::All);
        let mut sampler = FixedSampler::new();
        let (tx, rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(
            Duration::from_secs(5),
            h.tracker.run(&mut sampler, fast_cadence(), rx),
        )
        .await
        .expect("loop exits once the sender is gone");
    }
}
