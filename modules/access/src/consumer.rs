use std::sync::Arc;
use std::time::Duration;

use contracts::{AccessCodeIssuedPayload, AccessIssueFailedPayload, DomainEvent, Envelope};
use event_bus::{BusMessage, EventBus};
use futures::StreamExt;
use rand::Rng;
use sqlx::PgPool;

use crate::domain::generate_code;
use crate::outbox::enqueue_event;

const EVENTS_TOPIC: &str = "events";

/// Fraction of BookingCreated events for which issuance is simulated to
/// fail (spec.md §4.3), read from config rather than the Python
/// original's hardcoded `random.random() < 0.9`.
pub fn start_consumer(bus: Arc<dyn EventBus>, pool: PgPool, failure_rate: f64) {
    tokio::spawn(async move {
        loop {
            match bus.subscribe(EVENTS_TOPIC).await {
                Ok(mut stream) => {
                    tracing::info!("access consumer subscribed to events");
                    while let Some(msg) = stream.next().await {
                        handle_message(&pool, msg, failure_rate).await;
                    }
                    tracing::warn!("access consumer stream ended, resubscribing");
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to subscribe, retrying in 5s");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    });
}

async fn handle_message(pool: &PgPool, msg: BusMessage, failure_rate: f64) {
    let envelope: Envelope = match serde_json::from_slice(&msg.payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "poison message: unparseable JSON, dropping");
            return;
        }
    };

    let DomainEvent::BookingCreated(created) = &envelope.event else {
        return;
    };

    if let Err(e) = issue_or_fail(pool, created, failure_rate).await {
        tracing::error!(error = %e, booking_id = created.booking_id, "failed to handle BookingCreated");
    }
}

async fn issue_or_fail(
    pool: &PgPool,
    created: &contracts::BookingCreatedPayload,
    failure_rate: f64,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let event = if rand::thread_rng().gen_bool(failure_rate) {
        DomainEvent::AccessIssueFailed(AccessIssueFailedPayload {
            booking_id: created.booking_id,
            reason: "hardware-unavailable".to_string(),
        })
    } else {
        let code = generate_code(&mut rand::thread_rng());

        sqlx::query(
            "INSERT INTO access_codes (booking_id, code, valid_from, valid_to, status)
             VALUES ($1, $2, $3, $4, 'ACTIVE')
             ON CONFLICT (booking_id) DO UPDATE
             SET code = EXCLUDED.code, valid_from = EXCLUDED.valid_from, valid_to = EXCLUDED.valid_to",
        )
        .bind(created.booking_id)
        .bind(&code)
        .bind(created.start)
        .bind(created.end)
        .execute(&mut *tx)
        .await?;

        DomainEvent::AccessCodeIssued(AccessCodeIssuedPayload { booking_id: created.booking_id, code })
    };

    enqueue_event(&mut tx, &event).await?;
    tx.commit().await?;
    Ok(())
}
