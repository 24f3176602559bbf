//! Semantic Bridge Service
//!
//! Consumes insert and search requests, embeds their text, and writes to or
//! queries the vector index.
//!
//! ## Architecture
//!
//! ```text
//! Redis Stream (text-topic)
//!   ↓ (Consumer Group: semantic-bridge)
//! MessageRouter
//!   ├─ insert → EmbeddingGateway → Qdrant upsert (text_embeddings)
//!   └─ search → EmbeddingGateway → Qdrant search
//!                                   ↓
//!                        Redis Stream (response-topic)
//! ```
//!
//! ## Features
//!
//! - One consumer name per instance so unacknowledged entries are redelivered after a restart
//! - Graceful shutdown handling
//! - Health, readiness and Prometheus endpoints

pub mod config;

use axum::Router;
use core_config::{Environment, FromEnv, app_info};
use domain_semantic::{
    MessageRouter, QdrantIndex, ResponseTopic, RouterContext, VectorIndexGateway,
};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use stream_worker::{
    HealthState, StreamConsumer, StreamDef, StreamProducer, connect_consumer_with_retry,
    connect_with_retry, health_router, init_metrics,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

pub use config::BridgeConfig;

const REDIS_CONNECT_RETRIES: u32 = 10;

/// Start the health HTTP server
///
/// - Liveness probes: `/health`, `/healthz`
/// - Readiness probes: `/ready`, `/readyz`
/// - Stream monitoring: `/stream/info`
/// - Prometheus metrics: `/metrics`
async fn start_health_server(health_state: HealthState, address: String) -> Result<()> {
    let app: Router = health_router(health_state);

    let listener = TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", address))?;

    info!(address = %address, "Health server listening");

    axum::serve(listener, app)
        .await
        .wrap_err("Health server failed")?;

    Ok(())
}

/// Run the bridge
///
/// 1. Sets up error reports, logging and metrics
/// 2. Opens a command connection and a dedicated consumer connection to Redis,
///    then joins the inbound consumer group
/// 3. Builds the embedding provider and the Qdrant client
/// 4. Routes messages until SIGINT / SIGTERM
///
/// # Errors
///
/// Returns an error if configuration is invalid, Redis cannot be reached, or
/// the router hits a fatal transport error.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();

    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    init_metrics().wrap_err("Failed to install Prometheus recorder")?;

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, "Starting semantic bridge");
    info!("Environment: {:?}", environment);

    let config = BridgeConfig::from_env().wrap_err("Failed to load bridge configuration")?;

    let stream_config = config.stream_config();
    info!(
        stream = %stream_config.stream_name,
        consumer_group = %stream_config.consumer_group,
        consumer_id = %stream_config.consumer_id,
        block_timeout_ms = ?stream_config.block_timeout_ms,
        "Consumer configuration loaded"
    );

    info!("Connecting to Redis...");
    let redis = connect_with_retry(&config.redis.url, REDIS_CONNECT_RETRIES)
        .await
        .wrap_err("Failed to connect to Redis")?;
    let consumer_redis =
        connect_consumer_with_retry(&config.redis.url, &stream_config, REDIS_CONNECT_RETRIES)
            .await
            .wrap_err("Failed to open consumer connection to Redis")?;

    let consumer = StreamConsumer::new(consumer_redis, stream_config);
    consumer
        .ensure_consumer_group()
        .await
        .wrap_err("Failed to create consumer group")?;

    let producer = StreamProducer::new(redis.clone(), &config.outbound_stream)
        .with_max_length(ResponseTopic::MAX_LENGTH);

    let embeddings = config
        .embedding
        .build_gateway()
        .wrap_err("Failed to build embedding provider")?;
    info!(
        provider = embeddings.provider_name(),
        dimension = embeddings.dimension(),
        "Embedding provider ready"
    );

    let qdrant = QdrantIndex::new(config.qdrant.clone()).wrap_err("Failed to build Qdrant client")?;
    info!(url = %config.qdrant.url, collection = qdrant.collection(), "Qdrant client ready");
    let index = VectorIndexGateway::new(Arc::new(qdrant));

    let ctx = RouterContext::new(embeddings, index, Arc::new(producer))
        .with_search_limit(config.search_limit);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    let health_state = HealthState::new(
        redis,
        app_info.name,
        app_info.version,
        config.inbound_stream.clone(),
        config.consumer_group.clone(),
    );
    let health_address = config.health.address();
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, health_address).await {
            error!(error = %e, "Health server failed");
        }
    });

    let router = MessageRouter::new(Arc::new(consumer), ctx, config.inbound_stream.clone());
    router
        .run(shutdown_rx)
        .await
        .wrap_err("Message router failed")?;

    info!("Semantic bridge stopped");
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
