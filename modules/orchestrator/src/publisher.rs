use std::sync::Arc;
use std::time::Duration;

use event_bus::EventBus;
use sqlx::PgPool;
use tokio::time::sleep;

use crate::outbox::{fetch_unpublished_events, mark_as_published};

const EVENTS_TOPIC: &str = "events";

/// Background task that relays outbox rows onto the bus. Polling
/// rather than `LISTEN/NOTIFY` keeps this honest about the at-least-once
/// semantics spec.md assumes everywhere else.
pub async fn run_publisher(pool: PgPool, bus: Arc<dyn EventBus>) {
    tracing::info!("starting outbox publisher");

    loop {
        match publish_pending_events(&pool, &bus).await {
            Ok(count) if count > 0 => tracing::debug!(count, "published outbox events"),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "error publishing outbox events"),
        }

        sleep(Duration::from_secs(1)).await;
    }
}

async fn publish_pending_events(
    pool: &PgPool,
    bus: &Arc<dyn EventBus>,
) -> Result<usize, sqlx::Error> {
    let events = fetch_unpublished_events(pool, 100).await?;
    let mut published = 0;

    for event in events {
        let payload_bytes = match serde_json::to_vec(&event.payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(event_id = event.id, error = %e, "failed to serialize outbox payload, skipping");
                continue;
            }
        };

        match bus.publish(EVENTS_TOPIC, payload_bytes).await {
            Ok(()) => {
                mark_as_published(pool, event.id).await?;
                published += 1;
            }
            Err(e) => {
                tracing::warn!(event_id = event.id, error = %e, "failed to publish, will retry");
            }
        }
    }

    Ok(published)
}
