//! Consumer configuration
//!
//! This module provides `StreamConfig` for configuring a stream consumer.

use crate::registry::StreamDef;
use uuid::Uuid;

/// Configuration for a stream consumer
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Redis stream name
    pub stream_name: String,

    /// Consumer group name
    pub consumer_group: String,

    /// Unique consumer ID (auto-generated if not provided)
    pub consumer_id: String,

    /// Blocking read timeout in milliseconds (None = non-blocking)
    pub block_timeout_ms: Option<u64>,
}

impl StreamConfig {
    /// Create a new StreamConfig from a StreamDef
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self {
            stream_name: S::STREAM_NAME.to_string(),
            consumer_group: S::CONSUMER_GROUP.to_string(),
            consumer_id: format!("worker-{}", Uuid::new_v4()),
            block_timeout_ms: Some(S::BLOCK_TIMEOUT_MS),
        }
    }

    /// Create a new StreamConfig with explicit values
    pub fn new(stream_name: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            consumer_group: consumer_group.into(),
            consumer_id: format!("worker-{}", Uuid::new_v4()),
            block_timeout_ms: Some(1_000),
        }
    }

    /// Set the stream name
    pub fn with_stream_name(mut self, stream: impl Into<String>) -> Self {
        self.stream_name = stream.into();
        self
    }

    /// Set the consumer group
    pub fn with_consumer_group(mut self, group: impl Into<String>) -> Self {
        self.consumer_group = group.into();
        self
    }

    /// Set the consumer ID
    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }

    /// Set the blocking timeout (None for non-blocking)
    pub fn with_blocking(mut self, timeout_ms: Option<u64>) -> Self {
        self.block_timeout_ms = timeout_ms;
        self
    }

    /// Whether reads block on the server
    pub fn is_blocking(&self) -> bool {
        self.block_timeout_ms.is_some()
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new("stream:jobs", "workers")
    }
}
