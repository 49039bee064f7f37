//! Alert rule: classify a score transition.
//!
//! | previous | delta | corroborated | result     |
//! |----------|-------|--------------|------------|
//! | none     | n/a   | n/a          | no alert   |
//! | present  | <= 0  | any          | no alert   |
//! | present  | > 0   | false        | Suspicious |
//! | present  | > 0   | true         | Normal     |

use crate::types::AlertKind;

/// Outcome of a positive transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub kind: AlertKind,
    /// Score increase. Always `> 0`.
    pub delta: i64,
}

impl Verdict {
    /// Human-readable alert message for `username`.
    pub fn message(&self, username: &str) -> String {
        match self.kind {
            AlertKind::Suspicious => format!(
                "{username} score increased by {} (no corroborating event)",
                self.delta
            ),
            AlertKind::Normal => {
                format!("{username} score increased by {} (corroborated)", self.delta)
            }
        }
    }
}

/// Classify the transition from `previous` to `new`.
///
/// Returns `None` for a first sample or a non-increasing score.
pub fn evaluate(previous: Option<u64>, new: u64, corroborated: bool) -> Option<Verdict> {
    let previous = previous?;
    if new <= previous {
        return None;
    }

    let delta = i64::try_from(new - previous).unwrap_or(i64::MAX);
    let kind = if corroborated {
        AlertKind::Normal
    } else {
        AlertKind::Suspicious
    };
    Some(Verdict { kind, delta })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_never_alerts() {
        assert_eq!(evaluate(None, 500, false), None);
        assert_eq!(evaluate(None, 500, true), None);
    }

    #[test]
    fn zero_delta_never_alerts() {
        assert_eq!(evaluate(Some(150), 150, false), None);
        assert_eq!(evaluate(Some(150), 150, true), None);
    }

    #[test]
    fn decrease_never_alerts() {
        assert_eq!(evaluate(Some(150), 10, false), None);
        assert_eq!(evaluate(Some(150), 0, true), None);
    }

    #[test]
    fn uncorroborated_increase_is_suspicious() {
        let verdict = evaluate(Some(100), 150, false).unwrap();
        assert_eq!(verdict.kind, AlertKind::Suspicious);
        assert_eq!(verdict.delta, 50);
    }

    #[test]
    fn corroborated_increase_is_normal() {
        let verdict = evaluate(Some(150), 200, true).unwrap();
        assert_eq!(verdict.kind, AlertKind::Normal);
        assert_eq!(verdict.delta, 50);
    }

    #[test]
    fn delta_saturates_on_huge_jump() {
        let verdict = evaluate(Some(0), u64::MAX, false).unwrap();
        assert_eq!(verdict.delta, i64::MAX);
    }

    #[test]
    fn message_includes_username_and_delta() {
        let verdict = Verdict {
            kind: AlertKind::Suspicious,
            delta: 50,
        };
        assert_eq!(
            verdict.message("alice"),
            "alice score increased by 50 (no corroborating event)"
        );

        let verdict = Verdict {
            kind: AlertKind::Normal,
            delta: 7,
        };
        assert_eq!(verdict.message("bob"), "bob score increased by 7 (corroborated)");
    }
}
