use serde::{Deserialize, Serialize};

use crate::events::DomainEvent;

/// Wire shape for a message on the "events" topic: `{"type", "payload",
/// "messageId"}`. `message_id` is optional on the wire — producers that
/// don't set one fall back to [`Envelope::dedup_key`] downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(flatten)]
    pub event: DomainEvent,
    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none", default)]
    pub message_id: Option<String>,
}

impl Envelope {
    pub fn new(event: DomainEvent) -> Self {
        Self {
            event,
            message_id: None,
        }
    }

    pub fn with_message_id(event: DomainEvent, message_id: impl Into<String>) -> Self {
        Self {
            event,
            message_id: Some(message_id.into()),
        }
    }

    /// The key the orchestrator's consumer dedups on: `messageId` when
    /// present, else `"{type}:{bookingId}"` (spec.md §4.2).
    pub fn dedup_key(&self) -> String {
        match &self.message_id {
            Some(id) => id.clone(),
            None => format!("{}:{}", self.event.type_name(), self.event.booking_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BookingReadyPayload;

    #[test]
    fn dedup_key_uses_message_id_when_present() {
        let envelope = Envelope::with_message_id(
            DomainEvent::BookingReady(BookingReadyPayload { booking_id: 1 }),
            "abc-123",
        );
        assert_eq!(envelope.dedup_key(), "abc-123");
    }

    #[test]
    fn dedup_key_falls_back_to_type_and_booking_id() {
        let envelope = Envelope::new(DomainEvent::BookingReady(BookingReadyPayload {
            booking_id: 7,
        }));
        assert_eq!(envelope.dedup_key(), "BookingReady:7");
    }

    #[test]
    fn serializes_flattened_with_optional_message_id_omitted() {
        let envelope = Envelope::new(DomainEvent::BookingReady(BookingReadyPayload {
            booking_id: 7,
        }));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "BookingReady");
        assert_eq!(value["payload"]["bookingId"], 7);
        assert!(value.get("messageId").is_none());
    }

    #[test]
    fn round_trips_with_message_id() {
        let envelope = Envelope::with_message_id(
            DomainEvent::BookingReady(BookingReadyPayload { booking_id: 7 }),
            "msg-1",
        );
        let value = serde_json::to_value(&envelope).unwrap();
        let back: Envelope = serde_json::from_value(value).unwrap();
        assert_eq!(back, envelope);
    }
}
