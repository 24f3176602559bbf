//! Bridge configuration, loaded from the environment.

use core_config::redis::RedisConfig;
use core_config::server::ServerConfig;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use domain_semantic::{
    DEFAULT_SEARCH_LIMIT, EmbeddingConfig, QdrantConfig, ResponseTopic, TextTopic,
};
use stream_worker::{StreamConfig, StreamDef};

pub const DEFAULT_HEALTH_PORT: u16 = 8082;
pub const DEFAULT_CONSUMER_NAME: &str = "bridge-1";

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub redis: RedisConfig,
    pub qdrant: QdrantConfig,
    pub embedding: EmbeddingConfig,
    pub health: ServerConfig,
    pub inbound_stream: String,
    pub outbound_stream: String,
    pub consumer_group: String,
    /// Stable across restarts so unacknowledged entries are picked up again
    pub consumer_name: String,
    pub block_timeout_ms: u64,
    pub search_limit: u64,
}

impl FromEnv for BridgeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let search_limit = env_parse("SEARCH_LIMIT", DEFAULT_SEARCH_LIMIT)?;
        if search_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SEARCH_LIMIT".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            redis: RedisConfig::from_env()?,
            qdrant: QdrantConfig::from_env()?,
            embedding: EmbeddingConfig::from_env()?,
            health: ServerConfig::from_env_with_port("HEALTH_PORT", DEFAULT_HEALTH_PORT)?,
            inbound_stream: env_or_default("INBOUND_STREAM", TextTopic::STREAM_NAME),
            outbound_stream: env_or_default("OUTBOUND_STREAM", ResponseTopic::STREAM_NAME),
            consumer_group: env_or_default("CONSUMER_GROUP", TextTopic::CONSUMER_GROUP),
            consumer_name: env_or_default("CONSUMER_NAME", DEFAULT_CONSUMER_NAME),
            block_timeout_ms: env_parse("BLOCK_TIMEOUT_MS", TextTopic::BLOCK_TIMEOUT_MS)?,
            search_limit,
        })
    }
}

impl BridgeConfig {
    /// Consumer settings for the inbound stream
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig::from_stream_def::<TextTopic>()
            .with_stream_name(&self.inbound_stream)
            .with_consumer_group(&self.consumer_group)
            .with_consumer_id(&self.consumer_name)
            .with_blocking(Some(self.block_timeout_ms))
    }
}
