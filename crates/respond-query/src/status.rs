//! Lifecycle status, derived on every read.

use respond_types::{Action, ActionStatus};

/// Current wall-clock time in epoch milliseconds. Read once per evaluation pass.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `cleared` dominates; an active action whose start lies after `now_ms` is pending.
pub fn derive_status(action: &Action, now_ms: i64) -> ActionStatus {
    if action.cleared {
        ActionStatus::Cleared
    } else if action.active && action.start > now_ms {
        ActionStatus::Pending
    } else if action.active {
        ActionStatus::Active
    } else {
        ActionStatus::Expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(cleared: bool, active: bool, start: i64) -> Action {
        let mut a = Action::with_codeid(1);
        a.cleared = cleared;
        a.active = active;
        a.start = start;
        a
    }

    #[test]
    fn cleared_dominates_every_combination() {
        for active in [true, false] {
            for start in [0, 1_000, 2_000] {
                assert_eq!(
                    derive_status(&action(true, active, start), 1_000),
                    ActionStatus::Cleared
                );
            }
        }
    }

    #[test]
    fn start_boundary() {
        let now = 1_000;
        assert_eq!(derive_status(&action(false, true, now + 1), now), ActionStatus::Pending);
        assert_eq!(derive_status(&action(false, true, now), now), ActionStatus::Active);
        assert_eq!(derive_status(&action(false, true, now - 1), now), ActionStatus::Active);
        assert_eq!(derive_status(&action(false, false, now + 1), now), ActionStatus::Expired);
    }

    #[test]
    fn same_record_reclassified_as_clock_moves() {
        let a = action(false, true, 5_000);
        assert_eq!(derive_status(&a, 4_999), ActionStatus::Pending);
        assert_eq!(derive_status(&a, 5_000), ActionStatus::Active);
    }
}
