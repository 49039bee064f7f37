//! Tracker over a real RocksDB store, including reopen.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use scorewatch_core::constants::{MS_PER_DAY, RetentionPolicy};
use scorewatch_core::traits::{Clock, ManualClock, NullNotifier, RecordStore};
use scorewatch_core::types::{AlertKind, ScoreReading, Timestamp};
use scorewatch_node_lib::storage::RocksStore;
use scorewatch_node_lib::{NotifyPolicy, Tracker};

const START: Timestamp = Timestamp(1_700_000_000_000);

fn open_tracker(path: &Path, clock: Arc<ManualClock>) -> Tracker {
    let store = RocksStore::open(path).unwrap();
    Tracker::open(
        Box::new(store),
        Arc::new(NullNotifier),
        clock,
        NotifyPolicy::default(),
        RetentionPolicy::default(),
    )
    .unwrap()
}

fn reading(username: &str, score: i64, corroborated: bool) -> ScoreReading {
    ScoreReading {
        username: username.to_string(),
        score,
        corroborated,
    }
}

#[test]
fn history_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scoredata");
    let clock = Arc::new(ManualClock::new(START));

    {
        let tracker = open_tracker(&path, clock.clone());
        tracker.record(&reading("alice", 100, false)).unwrap();
        clock.advance(Duration::from_secs(300));
        tracker.record(&reading("alice", 150, false)).unwrap();
        tracker.track("bob").unwrap();
    }

    let tracker = open_tracker(&path, clock.clone());
    assert_eq!(tracker.usernames(), vec!["alice", "bob"]);

    let alice = tracker.user("alice").unwrap();
    assert_eq!(alice.scores.len(), 2);
    assert_eq!(alice.alerts.len(), 1);
    assert_eq!(alice.alerts[0].kind, AlertKind::Suspicious);
    assert!(tracker.user("bob").unwrap().scores.is_empty());

    // The first sample after reopen still compares against persisted history.
    clock.advance(Duration::from_secs(300));
    let alert = tracker
        .record(&reading("alice", 200, true))
        .unwrap()
        .unwrap();
    assert_eq!(alert.kind, AlertKind::Normal);
    assert_eq!(alert.delta, 50);
    assert_eq!(alert.seq, 1);
}

#[test]
fn sample_cap_holds_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scoredata");
    let clock = Arc::new(ManualClock::new(START));

    {
        let tracker = open_tracker(&path, clock.clone());
        for score in 0..150 {
            tracker.record(&reading("alice", score, false)).unwrap();
            clock.advance(Duration::from_secs(1));
        }
    }

    let store = RocksStore::open(&path).unwrap();
    let alice = store.get_user("alice").unwrap().unwrap();
    assert_eq!(alice.scores.len(), 100);
    assert_eq!(alice.scores.front().unwrap().score, 50);
    assert_eq!(alice.scores.back().unwrap().score, 149);
    assert_eq!(alice.alerts.len(), 50);
}

#[test]
fn prune_and_removal_reach_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scoredata");
    let clock = Arc::new(ManualClock::new(START));

    {
        let tracker = open_tracker(&path, clock.clone());
        tracker.record(&reading("alice", 1, false)).unwrap();
        tracker.record(&reading("alice", 2, false)).unwrap();
        tracker.record(&reading("carol", 9, false)).unwrap();

        clock.advance(Duration::from_millis((30 * MS_PER_DAY) as u64 + 1));
        tracker.record(&reading("alice", 3, false)).unwrap();

        let report = tracker.prune().unwrap();
        assert_eq!(report.samples_removed, 3);
        assert_eq!(report.alerts_removed, 1);

        assert!(tracker.remove_user("carol").unwrap());
    }

    let store = RocksStore::open(&path).unwrap();
    assert_eq!(store.usernames().unwrap(), vec!["alice"]);
    let alice = store.get_user("alice").unwrap().unwrap();
    assert_eq!(alice.scores.len(), 1);
    assert_eq!(alice.scores[0].score, 3);
    assert_eq!(alice.alerts.len(), 1);
    assert_eq!(store.last_prune().unwrap(), Some(clock.now()));
}

#[test]
fn clear_empties_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scoredata");
    let clock = Arc::new(ManualClock::new(START));

    {
        let tracker = open_tracker(&path, clock.clone());
        tracker.record(&reading("alice", 1, false)).unwrap();
        tracker.record(&reading("bob", 1, false)).unwrap();
        tracker.clear().unwrap();
    }

    let store = RocksStore::open(&path).unwrap();
    assert!(store.load_all().unwrap().is_empty());
}
