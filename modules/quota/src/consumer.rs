use std::sync::Arc;
use std::time::Duration;

use contracts::{DomainEvent, Envelope, QuotaDeniedPayload, QuotaReservedPayload};
use event_bus::{BusMessage, EventBus};
use futures::StreamExt;
use sqlx::PgPool;

use crate::domain::{decide, duration_minutes, week_start, QuotaDecision};
use crate::outbox::enqueue_event;

const EVENTS_TOPIC: &str = "events";

pub fn start_consumer(bus: Arc<dyn EventBus>, pool: PgPool, max_min_per_week: i32) {
    tokio::spawn(async move {
        loop {
            match bus.subscribe(EVENTS_TOPIC).await {
                Ok(mut stream) => {
                    tracing::info!("quota consumer subscribed to events");
                    while let Some(msg) = stream.next().await {
                        handle_message(&pool, msg, max_min_per_week).await;
                    }
                    tracing::warn!("quota consumer stream ended, resubscribing");
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to subscribe, retrying in 5s");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    });
}

async fn handle_message(pool: &PgPool, msg: BusMessage, max_min_per_week: i32) {
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

    if let Err(e) = reserve(pool, created, max_min_per_week).await {
        tracing::error!(error = %e, booking_id = created.booking_id, "failed to account for BookingCreated");
    }
}

/// Read-sum-then-insert wrapped in a SERIALIZABLE transaction (spec.md
/// §9 "MUST" note): two concurrent bookings for the same user/week
/// can't both read a stale sum and both get held past the cap.
async fn reserve(
    pool: &PgPool,
    created: &contracts::BookingCreatedPayload,
    max_min_per_week: i32,
) -> Result<(), sqlx::Error> {
    const MAX_RETRIES: u32 = 5;

    for attempt in 0..MAX_RETRIES {
        match try_reserve(pool, created, max_min_per_week).await {
            Ok(()) => return Ok(()),
            Err(e) if is_serialization_failure(&e) && attempt + 1 < MAX_RETRIES => {
                tracing::debug!(attempt, "quota reservation hit a serialization conflict, retrying");
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!("loop always returns on its last iteration")
}

fn is_serialization_failure(err: &sqlx::Error) -> bool {
    matches!(err.as_database_error().and_then(|e| e.code()), Some(code) if code == "40001")
}

async fn try_reserve(
    pool: &PgPool,
    created: &contracts::BookingCreatedPayload,
    max_min_per_week: i32,
) -> Result<(), sqlx::Error> {
    let duration_min = duration_minutes(created.start, created.end);
    let week = week_start(created.start);

    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;

    let (already_reserved,): (Option<i64>,) = sqlx::query_as(
        "SELECT SUM(minutes_reserved) FROM quota_reservations
         WHERE user_id = $1 AND week_start = $2 AND status IN ('HELD', 'COMMITTED')",
    )
    .bind(created.user_id)
    .bind(week)
    .fetch_one(&mut *tx)
    .await?;

    let decision = decide(already_reserved.unwrap_or(0) as i32, duration_min, max_min_per_week);

    let event = match decision {
        QuotaDecision::Denied => {
            sqlx::query(
                "INSERT INTO quota_reservations (user_id, week_start, minutes_reserved, status, booking_id)
                 VALUES ($1, $2, 0, 'DENIED', $3)",
            )
            .bind(created.user_id)
            .bind(week)
            .bind(created.booking_id)
            .execute(&mut *tx)
            .await?;

            DomainEvent::QuotaDenied(QuotaDeniedPayload {
                booking_id: created.booking_id,
                reason: "weekly-limit".to_string(),
            })
        }
        QuotaDecision::Held => {
            let (reservation_id,): (i64,) = sqlx::query_as(
                "INSERT INTO quota_reservations (user_id, week_start, minutes_reserved, status, booking_id)
                 VALUES ($1, $2, $3, 'HELD', $4)
                 RETURNING id",
            )
            .bind(created.user_id)
            .bind(week)
            .bind(duration_min)
            .bind(created.booking_id)
            .fetch_one(&mut *tx)
            .await?;

            DomainEvent::QuotaReserved(QuotaReservedPayload {
                booking_id: created.booking_id,
                reservation_id: reservation_id.to_string(),
            })
        }
    };

    enqueue_event(&mut tx, &event).await?;
    tx.commit().await?;
    Ok(())
}
