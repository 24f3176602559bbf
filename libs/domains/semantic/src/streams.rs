//! Stream definitions shared by the bridge and the HTTP gateway.

use stream_worker::StreamDef;

/// Inbound `insert` / `search` requests, read by the bridge.
pub struct TextTopic;

impl StreamDef for TextTopic {
    const STREAM_NAME: &'static str = "text-topic";
    const CONSUMER_GROUP: &'static str = "semantic-bridge";
}

/// Search responses, read by the HTTP gateway.
pub struct ResponseTopic;

impl StreamDef for ResponseTopic {
    const STREAM_NAME: &'static str = "response-topic";
    const CONSUMER_GROUP: &'static str = "semantic-gateway";
}
