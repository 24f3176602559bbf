//! Stream Worker Transport
//!
//! Redis Streams plumbing for workers that consume one logical stream and
//! publish to another.
//!
//! ## Features
//!
//! - **Transport traits**: `MessageSource` / `MessageSink` decouple handlers
//!   from Redis so tests can inject in-memory fakes
//! - **Consumer groups**: at-least-once delivery, own pending entries are
//!   re-read first after a restart
//! - **Strict ordering**: one entry is read, handled and acknowledged before
//!   the next is read
//! - **Prometheus metrics** and **health endpoints** for K8s probes
//!
//! ## Example
//!
//! ```ignore
//! use stream_worker::{MessageSink, MessageSource, StreamConfig, StreamConsumer, StreamProducer};
//!
//! let config = StreamConfig::new("text-topic", "bridge");
//! let consumer_redis = stream_worker::connect_consumer_with_retry(&redis_url, &config, 5).await?;
//! let consumer = StreamConsumer::new(consumer_redis, config);
//! consumer.ensure_consumer_group().await?;
//!
//! let redis = stream_worker::connect_with_retry(&redis_url, 5).await?;
//! let producer = StreamProducer::new(redis, "response-topic");
//!
//! while let Some(event) = consumer.recv().await? {
//!     producer.publish(event.payload.clone()).await?;
//!     consumer.ack(&event).await?;
//! }
//! ```

mod config;
mod connection;
mod consumer;
mod error;
mod event;
mod health;
pub mod metrics;
mod producer;
mod registry;
mod transport;

pub use config::StreamConfig;
pub use connection::{
    BLOCKING_READ_GRACE, connect, connect_consumer, connect_consumer_with_retry,
    connect_with_retry,
};
pub use consumer::{StreamConsumer, StreamInfo};
pub use error::StreamError;
pub use event::{PAYLOAD_FIELD, StreamEvent};
pub use health::{HealthState, health_router};
pub use metrics::{StreamMetrics, init_metrics};
pub use producer::StreamProducer;
pub use registry::StreamDef;
pub use transport::{MessageSink, MessageSource};
