use std::sync::Arc;
use std::time::Duration;

use contracts::{DomainEvent, Envelope};
use event_bus::{BusMessage, EventBus};
use futures::StreamExt;

const EVENTS_TOPIC: &str = "events";

/// No persistent state, no dedup, no outbox: a log line is emitted for
/// every delivery, including redeliveries after a reconnect (spec.md
/// §4.5 — this sink never publishes, so there's nothing for it to
/// de-duplicate against).
pub fn start_consumer(bus: Arc<dyn EventBus>) {
    tokio::spawn(async move {
        loop {
            match bus.subscribe(EVENTS_TOPIC).await {
                Ok(mut stream) => {
                    tracing::info!("notifications consumer subscribed to events");
                    while let Some(msg) = stream.next().await {
                        handle_message(msg);
                    }
                    tracing::warn!("notifications consumer stream ended, resubscribing");
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to subscribe, retrying in 5s");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    });
}

fn handle_message(msg: BusMessage) {
    let envelope: Envelope = match serde_json::from_slice(&msg.payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "poison message: unparseable JSON, dropping");
            return;
        }
    };

    match &envelope.event {
        DomainEvent::BookingReady(p) => {
            tracing::info!(booking_id = p.booking_id, event = "BookingReady", "mock email: studio is ready");
        }
        DomainEvent::BookingCancelled(p) => {
            tracing::info!(booking_id = p.booking_id, event = "BookingCancelled", reason = %p.reason, "mock email: booking cancelled");
        }
        DomainEvent::BookingCheckedIn(p) => {
            tracing::info!(booking_id = p.booking_id, event = "BookingCheckedIn", "mock email: checked in");
        }
        DomainEvent::BookingCheckedOut(p) => {
            tracing::info!(booking_id = p.booking_id, event = "BookingCheckedOut", "mock email: checked out");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BookingCancelledPayload, BookingCreatedPayload};

    #[test]
    fn ignores_events_outside_the_terminal_set() {
        let envelope = Envelope::new(DomainEvent::BookingCreated(BookingCreatedPayload {
            booking_id: 1,
            user_id: 1,
            studio_id: 1,
            start: chrono::Utc::now(),
            end: chrono::Utc::now(),
        }));
        let msg = BusMessage::new("events".to_string(), serde_json::to_vec(&envelope).unwrap());
        // No assertion beyond "doesn't panic" — this sink has no state to observe.
        handle_message(msg);
    }

    #[test]
    fn logs_terminal_events_without_panicking() {
        let envelope = Envelope::new(DomainEvent::BookingCancelled(BookingCancelledPayload {
            booking_id: 2,
            reason: "QuotaDenied".to_string(),
        }));
        let msg = BusMessage::new("events".to_string(), serde_json::to_vec(&envelope).unwrap());
        handle_message(msg);
    }

    #[test]
    fn drops_unparseable_payloads() {
        let msg = BusMessage::new("events".to_string(), b"not json".to_vec());
        handle_message(msg);
    }
}
