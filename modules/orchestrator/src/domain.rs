//! Pure booking domain logic — no I/O, so these rules are unit-tested
//! directly against spec.md §8's invariants without a live database.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use contracts::BookingStatus;

/// start < end (spec.md §3 invariant).
pub fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start < end
}

/// The allowed edges of the booking state graph (spec.md §4.2). Used
/// both to guard mutations and, in tests, to check that a recorded
/// status history never skips or reverses a step.
pub fn is_allowed_transition(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;
    matches!(
        (from, to),
        (Pending, Ready) | (Pending, Cancelled) | (Ready, InUse) | (InUse, Finished)
    )
}

/// A PENDING booking becomes READY once both replies have landed,
/// regardless of arrival order (spec.md §4.2 step 4, invariant 3).
pub fn is_join_complete(code: &Option<String>, quota_reservation_id: &Option<String>) -> bool {
    code.is_some() && quota_reservation_id.is_some()
}

pub fn can_check_in(status: BookingStatus) -> bool {
    status == BookingStatus::Ready
}

pub fn can_check_out(status: BookingStatus) -> bool {
    status == BookingStatus::InUse
}

/// Parse a Create-request timestamp. An offset-bearing string (RFC 3339
/// with `+hh:mm`/`Z`) is trusted as-is; a bare/naive string is
/// interpreted in `local_tz` and converted to UTC (spec.md §4.2 "Time
/// handling for Create").
pub fn parse_and_localize(raw: &str, local_tz: Tz) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| format!("unparseable timestamp '{raw}': {e}"))?;

    match local_tz.from_local_datetime(&naive).single() {
        Some(local) => Ok(local.with_timezone(&Utc)),
        None => Err(format!("ambiguous or nonexistent local time '{raw}'")),
    }
}

/// Render a persisted UTC instant in the configured local time zone
/// (spec.md §4.2 "Reads render timestamps in local time").
pub fn render_local(instant: DateTime<Utc>, local_tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&local_tz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_requires_start_before_end() {
        let start = Utc::now();
        let end = start + chrono::Duration::hours(1);
        assert!(validate_interval(start, end));
        assert!(!validate_interval(end, start));
        assert!(!validate_interval(start, start));
    }

    #[test]
    fn state_graph_allows_only_the_documented_edges() {
        use BookingStatus::*;
        let all = [Pending, Ready, InUse, Finished, Cancelled];
        let allowed = [(Pending, Ready), (Pending, Cancelled), (Ready, InUse), (InUse, Finished)];
        for &from in &all {
            for &to in &all {
                let expected = allowed.contains(&(from, to));
                assert_eq!(is_allowed_transition(from, to), expected, "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn join_completes_regardless_of_arrival_order() {
        assert!(!is_join_complete(&None, &None));
        assert!(!is_join_complete(&Some("123456".into()), &None));
        assert!(!is_join_complete(&None, &Some("42".into())));
        assert!(is_join_complete(&Some("123456".into()), &Some("42".into())));
    }

    #[test]
    fn naive_timestamp_is_localized_to_configured_zone() {
        let toronto: Tz = chrono_tz::America::Toronto;
        // 2025-03-10T14:00:00 in Toronto (EDT, UTC-4) is 18:00 UTC.
        let utc = parse_and_localize("2025-03-10T14:00:00", toronto).unwrap();
        assert_eq!(utc.format("%H:%M").to_string(), "18:00");
    }

    #[test]
    fn offset_bearing_timestamp_is_trusted_as_is() {
        let toronto: Tz = chrono_tz::America::Toronto;
        let utc = parse_and_localize("2025-03-10T14:00:00-04:00", toronto).unwrap();
        assert_eq!(utc.format("%H:%M").to_string(), "18:00");
    }

    #[test]
    fn render_local_round_trips_through_utc() {
        let toronto: Tz = chrono_tz::America::Toronto;
        let utc = parse_and_localize("2025-03-10T14:00:00", toronto).unwrap();
        let local = render_local(utc, toronto);
        assert_eq!(local.format("%H:%M").to_string(), "14:00");
    }
}
