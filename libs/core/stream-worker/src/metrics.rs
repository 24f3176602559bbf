//! Prometheus metrics for stream workers
//!
//! Provides observability into message handling: what arrived, how it ended,
//! which stage failed and how long it took.

use crate::error::StreamError;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::info;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize Prometheus metrics
///
/// Call this once at startup. Subsequent calls return the existing handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, StreamError> {
    PROMETHEUS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| StreamError::Config(format!("Prometheus recorder: {e}")))?;
        info!("Prometheus metrics initialized");
        Ok(handle)
    })
}

/// Get the Prometheus handle for rendering metrics
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in Prometheus format
pub fn render_metrics() -> String {
    prometheus_handle().map(|h| h.render()).unwrap_or_default()
}

/// Per-stream metrics helper
#[derive(Clone)]
pub struct StreamMetrics {
    stream_name: String,
    handler_name: String,
}

impl StreamMetrics {
    /// Create new StreamMetrics
    pub fn new(stream_name: impl Into<String>, handler_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            handler_name: handler_name.into(),
        }
    }

    /// Record a message being received, labelled by its declared type
    pub fn message_received(&self, kind: &str) {
        counter!(
            "stream_worker_messages_received_total",
            "stream" => self.stream_name.clone(),
            "handler" => self.handler_name.clone(),
            "type" => kind.to_string()
        )
        .increment(1);
    }

    /// Record how a message ended and how long handling took
    pub fn message_handled(&self, kind: &str, outcome: &str, duration: Duration) {
        counter!(
            "stream_worker_messages_handled_total",
            "stream" => self.stream_name.clone(),
            "handler" => self.handler_name.clone(),
            "type" => kind.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);

        histogram!(
            "stream_worker_message_duration_seconds",
            "stream" => self.stream_name.clone(),
            "handler" => self.handler_name.clone(),
            "type" => kind.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a pipeline stage failure
    pub fn pipeline_failed(&self, kind: &str, error_kind: &str) {
        counter!(
            "stream_worker_pipeline_errors_total",
            "stream" => self.stream_name.clone(),
            "handler" => self.handler_name.clone(),
            "type" => kind.to_string(),
            "error" => error_kind.to_string()
        )
        .increment(1);
    }

    /// Record a response being published
    pub fn response_published(&self) {
        counter!(
            "stream_worker_responses_published_total",
            "stream" => self.stream_name.clone(),
            "handler" => self.handler_name.clone()
        )
        .increment(1);
    }
}
