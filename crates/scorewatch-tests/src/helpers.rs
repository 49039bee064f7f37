//! Shared test helpers for property and E2E tests.

use std::time::Duration;

use scorewatch_core::constants::MS_PER_DAY;
use scorewatch_core::store::ScoreStore;
use scorewatch_core::types::{AlertRecord, Timestamp};

/// A fixed, realistic starting time (2023-11-14T22:13:20Z).
pub const T0: Timestamp = Timestamp(1_700_000_000_000);

/// Thirty days, the default retention window.
pub const THIRTY_DAYS: Duration = Duration::from_millis(30 * MS_PER_DAY as u64);

/// `T0` plus `millis`.
pub fn at(millis: i64) -> Timestamp {
    Timestamp::from_millis(T0.as_millis() + millis)
}

/// Feed `scores` for `username`, one second apart starting at `start`.
///
/// Returns the alert (if any) produced by each sample.
pub fn feed(
    store: &mut ScoreStore,
    username: &str,
    scores: &[u64],
    corroborated: bool,
    start: Timestamp,
) -> Vec<Option<AlertRecord>> {
    scores
        .iter()
        .enumerate()
        .map(|(i, &score)| {
            store
                .record_sample(
                    username,
                    score as i64,
                    corroborated,
                    Timestamp::from_millis(start.as_millis() + i as i64 * 1_000),
                )
                .unwrap()
        })
        .collect()
}
