use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain_semantic::SemanticError;
use serde::Serialize;
use stream_worker::StreamError;
use thiserror::Error;

/// Error body for every non-2xx response.
///
/// ```json
/// { "error": "GATEWAY_TIMEOUT", "message": "Search timeout" }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Failed to encode request: {0}")]
    Encode(#[from] SemanticError),

    #[error("Failed to publish request: {0}")]
    Publish(#[from] StreamError),

    #[error("Search timeout")]
    Timeout,

    #[error("Response listener stopped")]
    ListenerGone,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::JsonExtractorRejection(_) => StatusCode::BAD_REQUEST,
            GatewayError::Encode(_) | GatewayError::Publish(_) | GatewayError::ListenerGone => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            GatewayError::JsonExtractorRejection(e) => {
                tracing::warn!(error = %e, "Rejected request body");
                e.body_text()
            }
            GatewayError::Timeout => {
                tracing::warn!("Search timed out waiting for a response");
                self.to_string()
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                other.to_string()
            }
        };

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_uppercase()
                .replace(' ', "_"),
            message,
        };

        (status, Json(body)).into_response()
    }
}
