mod config;
mod consumer;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use config::{BusKind, Config};
use event_bus::{EventBus, InMemoryBus, RabbitBus};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().expect("failed to load configuration");

    let bus: Arc<dyn EventBus> = match config.bus_kind {
        BusKind::RabbitMq => {
            let url = config.rabbitmq_url.as_ref().expect("RABBITMQ_HOST required for rabbitmq bus");
            tracing::info!("connecting to rabbitmq");
            Arc::new(
                RabbitBus::connect(url)
                    .await
                    .expect("failed to connect to rabbitmq"),
            )
        }
        BusKind::InMemory => {
            tracing::info!("using in-memory event bus");
            Arc::new(InMemoryBus::new())
        }
    };

    consumer::start_consumer(bus);

    let app = Router::new().route("/healthz", get(health)).layer(
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid HOST/PORT");

    tracing::info!(%addr, "notifications listening");

    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "module": "notifications" }))
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to listen for ctrl_c");
    tracing::info!("shutdown signal received");
}
