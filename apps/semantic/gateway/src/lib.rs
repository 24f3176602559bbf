//! Semantic Gateway Service
//!
//! HTTP front door for the semantic bridge. Requests are published to the
//! inbound stream; search answers are matched back to the waiting caller by
//! `request_id`.
//!
//! ## Architecture
//!
//! ```text
//! POST /insert ──► Redis Stream (text-topic)
//! POST /search ──► Redis Stream (text-topic)
//!      ▲                    │
//!      │              semantic bridge
//!      │                    ▼
//! PendingRequests ◄── ResponseListener ◄── Redis Stream (response-topic)
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod listener;
pub mod pending;

use axum::{
    Router,
    routing::{get, post},
};
use core_config::{Environment, FromEnv, app_info};
use domain_semantic::TextTopic;
use eyre::{Result, WrapErr};
use std::sync::Arc;
use stream_worker::{
    StreamConsumer, StreamDef, StreamProducer, connect_consumer_with_retry, connect_with_retry,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use handlers::AppState;
pub use listener::ResponseListener;
pub use pending::PendingRequests;

const REDIS_CONNECT_RETRIES: u32 = 10;

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/insert", post(handlers::insert))
        .route("/search", post(handlers::search))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the gateway
///
/// # Errors
///
/// Returns an error if configuration is invalid, Redis cannot be reached, or
/// the HTTP listener cannot bind.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();

    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, "Starting semantic gateway");

    let config = GatewayConfig::from_env().wrap_err("Failed to load gateway configuration")?;

    info!("Connecting to Redis...");
    let redis = connect_with_retry(&config.redis.url, REDIS_CONNECT_RETRIES)
        .await
        .wrap_err("Failed to connect to Redis")?;

    let stream_config = config.response_stream_config();
    let consumer_redis =
        connect_consumer_with_retry(&config.redis.url, &stream_config, REDIS_CONNECT_RETRIES)
            .await
            .wrap_err("Failed to open consumer connection to Redis")?;

    let consumer = StreamConsumer::new(consumer_redis, stream_config);
    consumer
        .ensure_consumer_group()
        .await
        .wrap_err("Failed to create response consumer group")?;

    let producer = StreamProducer::new(redis, &config.request_stream)
        .with_max_length(TextTopic::MAX_LENGTH);

    let pending = PendingRequests::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    let listener = ResponseListener::new(Arc::new(consumer), pending.clone());
    let listener_shutdown = shutdown_rx.clone();
    let listener_task = tokio::spawn(async move { listener.run(listener_shutdown).await });

    let state = AppState::new(Arc::new(producer), pending, config.search_timeout());
    let app = router(state);

    let address = config.server.address();
    let tcp = TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("Failed to bind gateway to {}", address))?;
    info!(address = %address, search_timeout_secs = config.search_timeout_secs, "Gateway listening");

    let mut server_shutdown = shutdown_rx;
    axum::serve(tcp, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .wrap_err("Gateway server failed")?;

    if let Err(e) = listener_task.await {
        error!(error = %e, "Response listener task failed");
    }

    info!("Semantic gateway stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .wrap_err("Failed to install SIGTERM handler")?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.wrap_err("Failed to install Ctrl+C handler")?;
                info!("Received Ctrl+C, initiating shutdown...");
            },
            _ = terminate.recv() => {
                info!("Received SIGTERM, initiating shutdown...");
            },
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .wrap_err("Failed to install Ctrl+C handler")?;
        info!("Received Ctrl+C, initiating shutdown...");
    }

    Ok(())
}
