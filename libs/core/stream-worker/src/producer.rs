//! Stream producer
//!
//! Appends JSON payloads to a Redis stream under the `payload` field.
//!
//! # Example
//!
//! ```rust,ignore
//! use stream_worker::{StreamDef, StreamProducer};
//!
//! let producer = StreamProducer::from_stream_def::<ResponseTopic>(redis);
//! let entry_id = producer.send(&response).await?;
//! ```

use crate::error::StreamError;
use crate::event::PAYLOAD_FIELD;
use crate::registry::StreamDef;
use redis::aio::ConnectionManager;
use serde::Serialize;
use tracing::debug;

/// Appends entries to one Redis stream, trimmed with `MAXLEN ~`.
#[derive(Clone)]
pub struct StreamProducer {
    redis: ConnectionManager,
    stream_name: String,
    max_length: i64,
}

impl StreamProducer {
    /// Create a new StreamProducer for a specific stream.
    pub fn new(redis: ConnectionManager, stream_name: impl Into<String>) -> Self {
        Self {
            redis,
            stream_name: stream_name.into(),
            max_length: 100_000,
        }
    }

    /// Create a producer from a `StreamDef` implementation.
    pub fn from_stream_def<S: StreamDef>(redis: ConnectionManager) -> Self {
        Self {
            redis,
            stream_name: S::STREAM_NAME.to_string(),
            max_length: S::MAX_LENGTH,
        }
    }

    /// Set the maximum stream length (MAXLEN ~).
    pub fn with_max_length(mut self, max_length: i64) -> Self {
        self.max_length = max_length;
        self
    }

    /// Get the stream name.
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Append an already-encoded payload.
    ///
    /// Returns the Redis stream entry ID.
    pub async fn publish_raw(&self, payload: &str) -> Result<String, StreamError> {
        let mut conn = self.redis.clone();

        // MAXLEN ~ trims approximately, which is cheaper than exact trimming
        let stream_id: String = redis::cmd("XADD")
            .arg(&self.stream_name)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_length)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        debug!(
            stream = %self.stream_name,
            stream_id = %stream_id,
            bytes = payload.len(),
            "Published entry"
        );

        Ok(stream_id)
    }

    /// Serialize a value to JSON and append it.
    pub async fn send<T: Serialize>(&self, value: &T) -> Result<String, StreamError> {
        let json = serde_json::to_string(value)?;
        self.publish_raw(&json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect;
    use serde_json::json;
    use test_utils::{FakeRedis, TestRedis};

    struct ResponseTopic;

    impl StreamDef for ResponseTopic {
        const STREAM_NAME: &'static str = "response-topic";
        const CONSUMER_GROUP: &'static str = "test";
        const MAX_LENGTH: i64 = 10;
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_send_writes_payload_field() {
        let redis = TestRedis::new().await;
        let producer = StreamProducer::from_stream_def::<ResponseTopic>(redis.manager().await);

        let id = producer
            .send(&json!({"request_id": "r1", "results": {"status": "success", "results": []}}))
            .await
            .unwrap();

        let mut conn = redis.manager().await;
        let entries: Vec<(String, Vec<(String, String)>)> = redis::cmd("XRANGE")
            .arg("response-topic")
            .arg("-")
            .arg("+")
            .query_async(&mut conn)
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, id);
        let (field, value) = &entries[0].1[0];
        assert_eq!(field, PAYLOAD_FIELD);
        let decoded: serde_json::Value = serde_json::from_str(value).unwrap();
        assert_eq!(decoded["request_id"], "r1");
    }

    #[tokio::test]
    async fn test_publish_raw_appends_entries() {
        let fake = FakeRedis::start().await;
        let producer = StreamProducer::new(connect(&fake.url()).await.unwrap(), "fake-stream");

        let first = producer.publish_raw("{}").await.unwrap();
        let second = producer.publish_raw("{}").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(fake.len("fake-stream"), 2);
    }
}
