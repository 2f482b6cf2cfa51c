mod config;
mod consumer;
mod domain;
mod error;
mod models;
mod outbox;
mod publisher;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use config::{BusKind, Config};
use event_bus::{EventBus, InMemoryBus, RabbitBus};
use routes::AppState;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().expect("failed to load configuration");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    tracing::info!("database ready, migrations applied");

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

    consumer::start_consumer(bus.clone(), pool.clone(), config.access_failure_rate);

    let publisher_pool = pool.clone();
    let publisher_bus = bus.clone();
    tokio::spawn(async move {
        publisher::run_publisher(publisher_pool, publisher_bus).await;
    });

    let state = AppState { pool: pool.clone() };

    let app = routes::router(state)
        .merge(health::router(health::HealthState::new(pool, "access")))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid HOST/PORT");

    tracing::info!(%addr, "access listening");

    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to listen for ctrl_c");
    tracing::info!("shutdown signal received, draining in-flight requests");
}
