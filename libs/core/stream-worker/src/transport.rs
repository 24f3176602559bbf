//! Transport seams
//!
//! Handlers talk to these traits rather than to Redis directly.

use crate::consumer::StreamConsumer;
use crate::error::StreamError;
use crate::event::StreamEvent;
use crate::producer::StreamProducer;
use async_trait::async_trait;

/// Ordered source of inbound entries.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Next entry, or `None` if nothing arrived within the poll window.
    async fn recv(&self) -> Result<Option<StreamEvent>, StreamError>;

    /// Mark an entry as handled. It will not be delivered again.
    async fn ack(&self, event: &StreamEvent) -> Result<(), StreamError>;
}

/// Destination for outbound payloads.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Publish an encoded payload, returning the entry ID assigned to it.
    async fn publish(&self, payload: &str) -> Result<String, StreamError>;
}

#[async_trait]
impl MessageSource for StreamConsumer {
    async fn recv(&self) -> Result<Option<StreamEvent>, StreamError> {
        self.next_event().await
    }

    async fn ack(&self, event: &StreamEvent) -> Result<(), StreamError> {
        self.ack_id(&event.stream_id).await
    }
}

#[async_trait]
impl MessageSink for StreamProducer {
    async fn publish(&self, payload: &str) -> Result<String, StreamError> {
        self.publish_raw(payload).await
    }
}
