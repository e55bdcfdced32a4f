//! Status-driven timestamps.

use chrono::{DateTime, Utc};

/// Completion timestamp after a status write.
///
/// Set to `now` when the document enters its completed status, kept while
/// it stays completed, cleared when it leaves.
pub const fn completion_stamp(
    previous: Option<DateTime<Utc>>,
    is_completed: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (previous, is_completed) {
        (Some(stamp), true) => Some(stamp),
        (None, true) => Some(now),
        (_, false) => None,
    }
}

/// Milestone timestamp that is recorded once and never cleared, such as a
/// shipment's `shippedAt`.
pub const fn first_reached(
    previous: Option<DateTime<Utc>>,
    reached: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (previous, reached) {
        (Some(stamp), _) => Some(stamp),
        (None, true) => Some(now),
        (None, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn completion_is_set_kept_and_cleared() {
        let set = completion_stamp(None, true, at(9));
        assert_eq!(set, Some(at(9)));
        assert_eq!(completion_stamp(set, true, at(12)), Some(at(9)));
        assert_eq!(completion_stamp(set, false, at(12)), None);
        assert_eq!(completion_stamp(None, false, at(12)), None);
    }

    #[test]
    fn first_reached_is_sticky() {
        assert_eq!(first_reached(None, false, at(9)), None);
        let shipped = first_reached(None, true, at(9));
        assert_eq!(shipped, Some(at(9)));
        assert_eq!(first_reached(shipped, false, at(12)), Some(at(9)));
        assert_eq!(first_reached(shipped, true, at(12)), Some(at(9)));
    }
}
