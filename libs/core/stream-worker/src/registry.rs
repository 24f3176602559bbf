//! Stream definitions
//!
//! A `StreamDef` names a stream and the consumer group that reads it, so the
//! producer side and the consumer side agree on the same keys.

/// Static definition of a Redis stream.
///
/// # Example
///
/// ```rust,ignore
/// struct TextTopic;
///
/// impl StreamDef for TextTopic {
///     const STREAM_NAME: &'static str = "text-topic";
///     const CONSUMER_GROUP: &'static str = "semantic-bridge";
/// }
/// ```
pub trait StreamDef {
    /// Redis stream key.
    const STREAM_NAME: &'static str;

    /// Consumer group reading this stream.
    const CONSUMER_GROUP: &'static str;

    /// Approximate maximum length kept by `XADD MAXLEN ~`.
    const MAX_LENGTH: i64 = 100_000;

    /// `XREADGROUP BLOCK` timeout in milliseconds.
    const BLOCK_TIMEOUT_MS: u64 = 1_000;
}
