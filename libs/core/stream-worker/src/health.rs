//! Probe and monitoring endpoints served next to a stream consumer.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use redis::RedisResult;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::consumer::{self, StreamInfo};
use crate::metrics;

/// What the health endpoints report on
#[derive(Clone)]
pub struct HealthState {
    pub redis: ConnectionManager,
    pub app_name: String,
    pub app_version: String,
    pub stream_name: String,
    pub consumer_group: String,
}

impl HealthState {
    pub fn new(
        redis: ConnectionManager,
        app_name: impl Into<String>,
        app_version: impl Into<String>,
        stream_name: impl Into<String>,
        consumer_group: impl Into<String>,
    ) -> Self {
        Self {
            redis,
            app_name: app_name.into(),
            app_version: app_version.into(),
            stream_name: stream_name.into(),
            consumer_group: consumer_group.into(),
        }
    }
}

/// Liveness body
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub name: String,
    pub version: String,
}

/// Readiness body; `redis` is "ok" or the reason it is not
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub redis: String,
}

impl ReadyResponse {
    fn ready() -> Self {
        Self {
            status: "ready".to_string(),
            redis: "ok".to_string(),
        }
    }

    fn not_ready(reason: String) -> Self {
        Self {
            status: "not_ready".to_string(),
            redis: reason,
        }
    }
}

/// Liveness: answers as long as the process serves HTTP
pub async fn health_handler(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        name: state.app_name,
        version: state.app_version,
    })
}

/// Readiness: Redis must answer PING
pub async fn ready_handler(State(state): State<HealthState>) -> (StatusCode, Json<ReadyResponse>) {
    let mut conn = state.redis.clone();

    let pong: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;

    match pong {
        Ok(pong) if pong == "PONG" => (StatusCode::OK, Json(ReadyResponse::ready())),
        Ok(other) => {
            warn!(response = %other, "Unexpected PING response");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse::not_ready(format!("unexpected response: {}", other))),
            )
        }
        Err(e) => {
            warn!(error = %e, "Redis readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse::not_ready(format!("error: {}", e))),
            )
        }
    }
}

/// Length of the consumed stream and the group's pending count
pub async fn stream_info_handler(
    State(state): State<HealthState>,
) -> Result<Json<StreamInfo>, (StatusCode, Json<Value>)> {
    consumer::stream_info(state.redis.clone(), &state.stream_name, &state.consumer_group)
        .await
        .map(Json)
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("Failed to get stream info: {}", e) })),
            )
        })
}

/// Prometheus text exposition
pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::prometheus_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "metrics recorder not installed".to_string(),
        )
            .into_response(),
    }
}

/// `/health` `/healthz` `/ready` `/readyz` `/stream/info` `/metrics`
pub fn health_router(state: HealthState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/readyz", get(ready_handler))
        .route("/stream/info", get(stream_info_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use test_utils::TestRedis;
    use tower::ServiceExt;

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            name: "semantic-bridge".to_string(),
            version: "0.1.0".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"name\":\"semantic-bridge\""));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders_text() {
        metrics::init_metrics().unwrap();
        let app = axum::Router::new().route("/metrics", axum::routing::get(metrics_handler));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_health_endpoints_against_redis() {
        let redis = TestRedis::new().await;
        let state = HealthState::new(
            redis.manager().await,
            "semantic-bridge",
            "0.1.0",
            "text-topic",
            "semantic-bridge",
        );
        let app = health_router(state);

        let (status, body) = get_json(app.clone(), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = get_json(app.clone(), "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["redis"], "ok");

        let (status, body) = get_json(app, "/stream/info").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stream_name"], "text-topic");
        assert_eq!(body["length"], 0);
    }
}
