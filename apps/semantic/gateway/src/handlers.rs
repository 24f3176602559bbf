use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use domain_semantic::{InboundMessage, ResultEnvelope};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use stream_worker::MessageSink;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::pending::PendingRequests;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<dyn MessageSink>,
    pub pending: PendingRequests,
    pub search_timeout: Duration,
}

impl AppState {
    pub fn new(
        sink: Arc<dyn MessageSink>,
        pending: PendingRequests,
        search_timeout: Duration,
    ) -> Self {
        Self {
            sink,
            pending,
            search_timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InsertBody {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Accepted {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthBody {
    pub status: String,
}

/// POST /insert
#[instrument(skip_all)]
pub async fn insert(
    State(state): State<AppState>,
    body: Result<Json<InsertBody>, JsonRejection>,
) -> Result<Json<Accepted>, GatewayError> {
    let Json(body) = body?;

    let payload = InboundMessage::insert(body.text).encode()?;
    let entry_id = state.sink.publish(&payload).await?;
    debug!(entry_id = %entry_id, "Insert request published");

    Ok(Json(Accepted {
        status: "success".to_string(),
        message: "Text sent for processing".to_string(),
    }))
}

/// POST /search
///
/// Publishes the query and waits for the bridge to answer on the response
/// stream. The waiter is removed on every way out, including the client
/// hanging up mid-wait.
#[instrument(skip_all, fields(request_id = tracing::field::Empty))]
pub async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<ResultEnvelope>, GatewayError> {
    let Json(body) = body?;

    let request_id = Uuid::new_v4().to_string();
    tracing::Span::current().record("request_id", request_id.as_str());

    let payload = InboundMessage::search(body.query, Some(request_id.clone())).encode()?;
    let mut waiter = state.pending.register(&request_id);

    state.sink.publish(&payload).await?;
    debug!("Search request published");

    match tokio::time::timeout(state.search_timeout, waiter.response()).await {
        Ok(Some(envelope)) => Ok(Json(envelope)),
        Ok(None) => Err(GatewayError::ListenerGone),
        Err(_) => Err(GatewayError::Timeout),
    }
}

/// GET /health
pub async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_string(),
    })
}
