use std::sync::Arc;
use std::time::Duration;

use contracts::{BookingStatus, DomainEvent, Envelope};
use event_bus::{BusMessage, EventBus};
use futures::StreamExt;
use sqlx::PgPool;

use crate::domain::is_join_complete;
use crate::models::BookingRow;
use crate::outbox::enqueue_event;

const EVENTS_TOPIC: &str = "events";

/// Spawn the bus-subscription task. One message in flight at a time
/// (spec.md §5): the loop awaits `handle_message` fully before pulling
/// the next item off the stream.
pub fn start_consumer(bus: Arc<dyn EventBus>, pool: PgPool) {
    tokio::spawn(async move {
        loop {
            match bus.subscribe(EVENTS_TOPIC).await {
                Ok(mut stream) => {
                    tracing::info!("orchestrator consumer subscribed to events");
                    while let Some(msg) = stream.next().await {
                        handle_message(&pool, msg).await;
                    }
                    tracing::warn!("orchestrator consumer stream ended, resubscribing");
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to subscribe, retrying in 5s");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    });
}

async fn handle_message(pool: &PgPool, msg: BusMessage) {
    let envelope: Envelope = match serde_json::from_slice(&msg.payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "poison message: unparseable JSON, dropping");
            return;
        }
    };

    if let Err(e) = process_envelope(pool, &envelope).await {
        tracing::error!(error = %e, dedup_key = envelope.dedup_key(), "failed to process event, will be redelivered");
    }
}

/// The per-message transaction described in spec.md §4.2: dedup check,
/// booking resolution, dispatch, join check, mark-processed — all
/// inside one transaction so a crash mid-handler never leaves the
/// booking row and the dedup table disagreeing with each other.
async fn process_envelope(pool: &PgPool, envelope: &Envelope) -> Result<(), sqlx::Error> {
    let message_id = envelope.dedup_key();
    let booking_id = envelope.event.booking_id();

    let mut tx = pool.begin().await?;

    let already_processed: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM processed_messages WHERE message_id = $1")
            .bind(&message_id)
            .fetch_optional(&mut *tx)
            .await?;
    if already_processed.is_some() {
        tracing::debug!(message_id, "already processed, dropping");
        tx.commit().await?;
        return Ok(());
    }

    let booking = sqlx::query_as::<_, BookingRow>(
        "SELECT id, user_id, studio_id, start_at, end_at, status, code, quota_reservation_id, created_at
         FROM bookings WHERE id = $1 FOR UPDATE",
    )
    .bind(booking_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(booking) = booking else {
        tracing::warn!(booking_id, "poison message: unknown booking, marking processed");
        mark_processed(&mut tx, &message_id).await?;
        tx.commit().await?;
        return Ok(());
    };

    let mut status: BookingStatus = booking.status.parse().unwrap_or(BookingStatus::Pending);
    let mut code = booking.code.clone();
    let mut quota_reservation_id = booking.quota_reservation_id.clone();

    match &envelope.event {
        DomainEvent::AccessCodeIssued(p) => {
            code = Some(p.code.clone());
            sqlx::query("UPDATE bookings SET code = $1 WHERE id = $2")
                .bind(&p.code)
                .bind(booking_id)
                .execute(&mut *tx)
                .await?;
        }
        DomainEvent::QuotaReserved(p) => {
            quota_reservation_id = Some(p.reservation_id.clone());
            sqlx::query("UPDATE bookings SET quota_reservation_id = $1 WHERE id = $2")
                .bind(&p.reservation_id)
                .bind(booking_id)
                .execute(&mut *tx)
                .await?;
        }
        DomainEvent::AccessIssueFailed(_) | DomainEvent::QuotaDenied(_) => {
            sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2")
                .bind(BookingStatus::Cancelled.as_str())
                .bind(booking_id)
                .execute(&mut *tx)
                .await?;

            let cancelled = DomainEvent::BookingCancelled(contracts::BookingCancelledPayload {
                booking_id,
                reason: envelope.event.type_name().to_string(),
            });
            enqueue_event(&mut tx, &cancelled).await?;
            mark_processed(&mut tx, &message_id).await?;
            tx.commit().await?;
            return Ok(());
        }
        _ => {
            // Events not relevant to this dispatch (BookingCreated,
            // BookingReady, BookingCheckedIn, BookingCheckedOut,
            // BookingCancelled) still arrive over the fanout exchange;
            // record them processed with no further effect.
        }
    }

    if status == BookingStatus::Pending && is_join_complete(&code, &quota_reservation_id) {
        status = BookingStatus::Ready;
        sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        let ready = DomainEvent::BookingReady(contracts::BookingReadyPayload { booking_id });
        enqueue_event(&mut tx, &ready).await?;
    }

    mark_processed(&mut tx, &message_id).await?;
    tx.commit().await?;
    Ok(())
}

async fn mark_processed(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    message_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO processed_messages (message_id, processed_at) VALUES ($1, NOW())
         ON CONFLICT (message_id) DO NOTHING",
    )
    .bind(message_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
