use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One tagged-variant type per event on the "events" topic.
///
/// Serializes as `{"type": "<Variant>", "payload": {...}}`; deserializing
/// an unrecognized `type` fails rather than silently defaulting, so
/// callers can tell "unknown event" apart from "malformed known event"
/// and log the two differently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum DomainEvent {
    BookingCreated(BookingCreatedPayload),
    AccessCodeIssued(AccessCodeIssuedPayload),
    AccessIssueFailed(AccessIssueFailedPayload),
    QuotaReserved(QuotaReservedPayload),
    QuotaDenied(QuotaDeniedPayload),
    BookingReady(BookingReadyPayload),
    BookingCheckedIn(BookingCheckedInPayload),
    BookingCheckedOut(BookingCheckedOutPayload),
    BookingCancelled(BookingCancelledPayload),
}

impl DomainEvent {
    /// The `type` discriminant, for logging and for the dedup fallback
    /// `"{type}:{bookingId}"` key (spec.md §4.2).
    pub fn type_name(&self) -> &'static str {
        match self {
            DomainEvent::BookingCreated(_) => "BookingCreated",
            DomainEvent::AccessCodeIssued(_) => "AccessCodeIssued",
            DomainEvent::AccessIssueFailed(_) => "AccessIssueFailed",
            DomainEvent::QuotaReserved(_) => "QuotaReserved",
            DomainEvent::QuotaDenied(_) => "QuotaDenied",
            DomainEvent::BookingReady(_) => "BookingReady",
            DomainEvent::BookingCheckedIn(_) => "BookingCheckedIn",
            DomainEvent::BookingCheckedOut(_) => "BookingCheckedOut",
            DomainEvent::BookingCancelled(_) => "BookingCancelled",
        }
    }

    /// The booking this event is about, used for the dedup fallback key
    /// and for poison-message logging.
    pub fn booking_id(&self) -> i64 {
        match self {
            DomainEvent::BookingCreated(p) => p.booking_id,
            DomainEvent::AccessCodeIssued(p) => p.booking_id,
            DomainEvent::AccessIssueFailed(p) => p.booking_id,
            DomainEvent::QuotaReserved(p) => p.booking_id,
            DomainEvent::QuotaDenied(p) => p.booking_id,
            DomainEvent::BookingReady(p) => p.booking_id,
            DomainEvent::BookingCheckedIn(p) => p.booking_id,
            DomainEvent::BookingCheckedOut(p) => p.booking_id,
            DomainEvent::BookingCancelled(p) => p.booking_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreatedPayload {
    pub booking_id: i64,
    pub user_id: i64,
    pub studio_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessCodeIssuedPayload {
    pub booking_id: i64,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessIssueFailedPayload {
    pub booking_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaReservedPayload {
    pub booking_id: i64,
    pub reservation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaDeniedPayload {
    pub booking_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingReadyPayload {
    pub booking_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingCheckedInPayload {
    pub booking_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingCheckedOutPayload {
    pub booking_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingCancelledPayload {
    pub booking_id: i64,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_and_payload_fields() {
        let event = DomainEvent::BookingReady(BookingReadyPayload { booking_id: 1 });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "BookingReady");
        assert_eq!(value["payload"]["bookingId"], 1);
    }

    #[test]
    fn deserializes_camel_case_wire_fields() {
        let raw = serde_json::json!({
            "type": "QuotaReserved",
            "payload": {"bookingId": 4, "reservationId": "42"},
        });
        let event: DomainEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(
            event,
            DomainEvent::QuotaReserved(QuotaReservedPayload {
                booking_id: 4,
                reservation_id: "42".into(),
            })
        );
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        let raw = serde_json::json!({"type": "SomethingElse", "payload": {}});
        let result: Result<DomainEvent, _> = serde_json::from_value(raw);
        assert!(result.is_err());
    }

    #[test]
    fn booking_id_and_type_name_cover_every_variant() {
        let events = vec![
            DomainEvent::BookingCreated(BookingCreatedPayload {
                booking_id: 1,
                user_id: 1,
                studio_id: 1,
                start: Utc::now(),
                end: Utc::now(),
            }),
            DomainEvent::AccessCodeIssued(AccessCodeIssuedPayload {
                booking_id: 2,
                code: "123456".into(),
            }),
            DomainEvent::AccessIssueFailed(AccessIssueFailedPayload {
                booking_id: 3,
                reason: "hardware-unavailable".into(),
            }),
            DomainEvent::QuotaReserved(QuotaReservedPayload {
                booking_id: 4,
                reservation_id: "42".into(),
            }),
            DomainEvent::QuotaDenied(QuotaDeniedPayload {
                booking_id: 5,
                reason: "weekly-limit".into(),
            }),
            DomainEvent::BookingReady(BookingReadyPayload { booking_id: 6 }),
            DomainEvent::BookingCheckedIn(BookingCheckedInPayload { booking_id: 7 }),
            DomainEvent::BookingCheckedOut(BookingCheckedOutPayload { booking_id: 8 }),
            DomainEvent::BookingCancelled(BookingCancelledPayload {
                booking_id: 9,
                reason: "QuotaDenied".into(),
            }),
        ];

        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.booking_id(), (i + 1) as i64);
            assert!(!event.type_name().is_empty());
        }
    }
}
