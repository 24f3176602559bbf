use core_config::redis::RedisConfig;
use core_config::server::ServerConfig;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use domain_semantic::{ResponseTopic, TextTopic};
use std::time::Duration;
use stream_worker::{StreamConfig, StreamDef};

pub const DEFAULT_GATEWAY_PORT: u16 = 8080;
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONSUMER_NAME: &str = "gateway-1";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub redis: RedisConfig,
    pub server: ServerConfig,
    /// Where insert and search requests are published
    pub request_stream: String,
    /// Where correlated search responses arrive
    pub response_stream: String,
    pub consumer_group: String,
    pub consumer_name: String,
    pub block_timeout_ms: u64,
    pub search_timeout_secs: u64,
}

impl FromEnv for GatewayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let search_timeout_secs = env_parse("SEARCH_TIMEOUT_SECS", DEFAULT_SEARCH_TIMEOUT_SECS)?;
        if search_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SEARCH_TIMEOUT_SECS".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            redis: RedisConfig::from_env()?,
            server: ServerConfig::from_env_with_port("GATEWAY_PORT", DEFAULT_GATEWAY_PORT)?,
            request_stream: env_or_default("INBOUND_STREAM", TextTopic::STREAM_NAME),
            response_stream: env_or_default("OUTBOUND_STREAM", ResponseTopic::STREAM_NAME),
            consumer_group: env_or_default("CONSUMER_GROUP", ResponseTopic::CONSUMER_GROUP),
            consumer_name: env_or_default("CONSUMER_NAME", DEFAULT_CONSUMER_NAME),
            block_timeout_ms: env_parse("BLOCK_TIMEOUT_MS", ResponseTopic::BLOCK_TIMEOUT_MS)?,
            search_timeout_secs,
        })
    }
}

impl GatewayConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// Consumer settings for the response listener
    pub fn response_stream_config(&self) -> StreamConfig {
        StreamConfig::from_stream_def::<ResponseTopic>()
            .with_stream_name(&self.response_stream)
            .with_consumer_group(&self.consumer_group)
            .with_consumer_id(&self.consumer_name)
            .with_blocking(Some(self.block_timeout_ms))
    }
}
