//! Pure quota-accounting logic — no I/O, mirroring
//! `modules/orchestrator/src/domain.rs`'s separation.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Monday date of the week containing `instant`, in UTC (spec.md §4.4:
/// the quota week boundary is always Monday 00:00 UTC, independent of
/// `LOCAL_TZ`). Stored as `DATE`, matching `quota_reservations.week_start`.
pub fn week_start(instant: DateTime<Utc>) -> NaiveDate {
    let date = instant.date_naive();
    date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Whole minutes between `start` and `end`, truncated (matches the
/// original's `int(total_seconds() // 60)`).
pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i32 {
    ((end - start).num_seconds() / 60) as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Held,
    Denied,
}

/// The hold/deny rule from spec.md §4.4: a booking is held iff the sum
/// of already-HELD-or-COMMITTED minutes this week plus this booking's
/// duration does not exceed the weekly cap.
pub fn decide(already_reserved_min: i32, duration_min: i32, max_min_per_week: i32) -> QuotaDecision {
    if already_reserved_min + duration_min > max_min_per_week {
        QuotaDecision::Denied
    } else {
        QuotaDecision::Held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn week_start_is_the_preceding_monday() {
        // 2025-03-12 is a Wednesday.
        let wed = Utc.with_ymd_and_hms(2025, 3, 12, 15, 30, 0).unwrap();
        let start = week_start(wed);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn week_start_on_monday_is_itself() {
        let mon = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let start = week_start(mon);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn duration_truncates_partial_minutes() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let end = start + chrono::Duration::seconds(90 * 60 + 29);
        assert_eq!(duration_minutes(start, end), 90);
    }

    #[test]
    fn decision_holds_when_under_cap() {
        assert_eq!(decide(60, 60, 180), QuotaDecision::Held);
        assert_eq!(decide(120, 60, 180), QuotaDecision::Held);
    }

    #[test]
    fn decision_denies_when_over_cap() {
        assert_eq!(decide(150, 60, 180), QuotaDecision::Denied);
    }
}
