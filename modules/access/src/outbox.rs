use chrono::{DateTime, Utc};
use contracts::DomainEvent;
use sqlx::{PgPool, Postgres, Transaction};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxRecord {
    pub id: i64,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Same transactional-outbox shape as the orchestrator: the access-code
/// row (or the absence of one, on a simulated failure) and the intent
/// to publish land in one transaction.
pub async fn enqueue_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &DomainEvent,
) -> Result<i64, sqlx::Error> {
    let payload = serde_json::to_value(event).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let id: (i64,) = sqlx::query_as("INSERT INTO events_outbox (payload) VALUES ($1) RETURNING id")
        .bind(payload)
        .fetch_one(&mut **tx)
        .await?;

    tracing::debug!(event_id = id.0, event_type = event.type_name(), "enqueued event");
    Ok(id.0)
}

pub async fn fetch_unpublished_events(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<OutboxRecord>, sqlx::Error> {
    sqlx::query_as::<_, OutboxRecord>(
        "SELECT id, payload, created_at, published_at
         FROM events_outbox
         WHERE published_at IS NULL
         ORDER BY created_at ASC
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn mark_as_published(pool: &PgPool, event_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE events_outbox SET published_at = NOW() WHERE id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}
