//! RabbitMQ-based implementation of the EventBus trait.
//!
//! The booking platform has exactly one topic ("events") and every
//! consumer wants every message, so this adapter hardcodes fan-out
//! semantics: a durable `fanout` exchange, and one exclusive,
//! auto-deleted queue per call to [`RabbitBus::subscribe`]. There is no
//! routing-key or topic-pattern support — `subject` is accepted for
//! trait compatibility and used only for logging.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties, ExchangeKind};
use tracing::{error, info, warn};

use crate::{BusError, BusMessage, BusResult, EventBus};

const EXCHANGE: &str = "events";
const CONSUMER_TAG: &str = "booking-platform-consumer";

/// EventBus implementation backed by a RabbitMQ fanout exchange.
///
/// # Example
/// ```rust,no_run
/// use event_bus::{EventBus, RabbitBus};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = RabbitBus::connect("amqp://localhost:5672/%2f").await?;
/// bus.publish("events", b"hello".to_vec()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RabbitBus {
    url: String,
}

impl RabbitBus {
    /// Connect to the broker and declare the durable "events" exchange.
    ///
    /// The connection is verified eagerly (declaring the exchange
    /// requires a live channel) but not retained — `publish` and
    /// `subscribe` each open their own connection so that a dropped
    /// connection on one side doesn't take the other down with it.
    pub async fn connect(url: impl Into<String>) -> BusResult<Self> {
        let url = url.into();
        let conn = Self::open_connection(&url).await?;
        let channel = conn
            .create_channel()
            .await
            .map_err(|e| BusError::ConnectionError(e.to_string()))?;
        declare_exchange(&channel).await?;
        Ok(Self { url })
    }

    async fn open_connection(url: &str) -> BusResult<Connection> {
        Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| BusError::ConnectionError(e.to_string()))
    }
}

async fn declare_exchange(channel: &lapin::Channel) -> BusResult<()> {
    channel
        .exchange_declare(
            EXCHANGE,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| BusError::ConnectionError(e.to_string()))?;
    Ok(())
}

/// Reconnect backoff: attempt *n* waits `min(5n, 30)` seconds.
fn backoff_for_attempt(attempt: u32) -> Duration {
    Duration::from_secs((5 * attempt as u64).min(30))
}

async fn setup_consumer(url: &str, subject: &str) -> BusResult<(Connection, lapin::Consumer)> {
    let conn = RabbitBus::open_connection(url).await?;
    let channel = conn
        .create_channel()
        .await
        .map_err(|e| BusError::SubscribeError(e.to_string()))?;

    declare_exchange(&channel).await?;

    let queue = channel
        .queue_declare(
            "",
            QueueDeclareOptions {
                exclusive: true,
                auto_delete: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| BusError::SubscribeError(e.to_string()))?;

    channel
        .queue_bind(
            queue.name().as_str(),
            EXCHANGE,
            "",
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| BusError::SubscribeError(e.to_string()))?;

    let consumer = channel
        .basic_consume(
            queue.name().as_str(),
            CONSUMER_TAG,
            BasicConsumeOptions {
                no_ack: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| BusError::SubscribeError(e.to_string()))?;

    info!(queue = %queue.name().as_str(), subject = %subject, "bound exclusive queue to events exchange");

    Ok((conn, consumer))
}

#[async_trait]
impl EventBus for RabbitBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        let conn = Self::open_connection(&self.url).await?;
        let channel = conn
            .create_channel()
            .await
            .map_err(|e| BusError::PublishError(e.to_string()))?;

        channel
            .basic_publish(
                EXCHANGE,
                "",
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| BusError::PublishError(e.to_string()))?
            .await
            .map_err(|e| BusError::PublishError(e.to_string()))?;

        let _ = subject; // fanout: routing key is always "", subject is log context only
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        let url = self.url.clone();
        let subject = subject.to_string();

        // Validate the connection up front so a misconfigured URL fails
        // the subscribe call instead of looping silently in the stream.
        let (first_conn, first_consumer) = setup_consumer(&url, &subject).await?;

        let stream = async_stream::stream! {
            let mut conn = first_conn;
            let mut consumer = first_consumer;
            let mut attempt: u32 = 0;

            loop {
                let mut ended_cleanly = true;
                loop {
                    match consumer.next().await {
                        Some(Ok(delivery)) => {
                            attempt = 0;
                            yield BusMessage::new(subject.clone(), delivery.data.clone());
                        }
                        Some(Err(e)) => {
                            error!(error = %e, subject = %subject, "consumer delivery error, reconnecting");
                            ended_cleanly = false;
                            break;
                        }
                        None => break,
                    }
                }

                let _ = &conn; // keep the connection alive for the lifetime of the consumer
                if !ended_cleanly {
                    warn!(subject = %subject, "events consumer stream broken, will reconnect");
                }

                attempt += 1;
                let wait = backoff_for_attempt(attempt);
                warn!(subject = %subject, attempt, wait_secs = wait.as_secs(), "reconnecting to events exchange");
                tokio::time::sleep(wait).await;

                loop {
                    match setup_consumer(&url, &subject).await {
                        Ok((new_conn, new_consumer)) => {
                            conn = new_conn;
                            consumer = new_consumer;
                            attempt = 0;
                            break;
                        }
                        Err(e) => {
                            attempt += 1;
                            let wait = backoff_for_attempt(attempt);
                            error!(error = %e, subject = %subject, attempt, wait_secs = wait.as_secs(), "failed to reconnect, retrying");
                            tokio::time::sleep(wait).await;
                        }
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_matches_min_5n_30_formula() {
        assert_eq!(backoff_for_attempt(1), Duration::from_secs(5));
        assert_eq!(backoff_for_attempt(2), Duration::from_secs(10));
        assert_eq!(backoff_for_attempt(6), Duration::from_secs(30));
        assert_eq!(backoff_for_attempt(100), Duration::from_secs(30));
    }
}
