//! Stream event wrapper
//!
//! Wraps a raw entry payload with its stream metadata (ID, timestamp, etc.).
//! Decoding the payload is left to the handler so that schema errors can be
//! reported through the handler's own error taxonomy.

use chrono::{DateTime, Utc};

/// Entry field holding the JSON payload, on both inbound and outbound streams.
pub const PAYLOAD_FIELD: &str = "payload";

/// A stream entry: raw JSON payload plus metadata
#[derive(Debug, Clone)]
pub struct StreamEvent {
    /// Redis stream entry ID (e.g., "1234567890123-0")
    pub stream_id: String,

    /// Raw UTF-8 payload as published
    pub payload: String,

    /// When the entry was added (parsed from stream ID)
    pub timestamp: DateTime<Utc>,

    /// True when read back from this consumer's pending list (a redelivery)
    pub redelivered: bool,
}

impl StreamEvent {
    /// Create a new StreamEvent
    pub fn new(stream_id: impl Into<String>, payload: impl Into<String>) -> Self {
        let stream_id = stream_id.into();
        let timestamp = Self::parse_timestamp(&stream_id);
        Self {
            stream_id,
            payload: payload.into(),
            timestamp,
            redelivered: false,
        }
    }

    /// Mark the event as a redelivery
    pub fn redelivered(mut self) -> Self {
        self.redelivered = true;
        self
    }

    /// Parse timestamp from Redis stream ID
    ///
    /// Stream IDs are in format "timestamp_ms-sequence"
    fn parse_timestamp(stream_id: &str) -> DateTime<Utc> {
        stream_id
            .split('-')
            .next()
            .and_then(|ts| ts.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now)
    }

    /// Milliseconds since the entry was added
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.timestamp).num_milliseconds()
    }
}
