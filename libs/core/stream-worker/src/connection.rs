//! Redis connection setup
//!
//! A blocking `XREADGROUP` occupies its connection for the whole block
//! timeout, and commands on a multiplexed connection are answered in order.
//! Consumers therefore get a connection of their own ([`connect_consumer`]),
//! whose response timeout outlasts the block. Producers and health checks
//! share a command connection ([`connect`]) with the client defaults.

use redis::Client;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::StreamConfig;
use crate::error::StreamError;

/// Extra time a blocking read may take beyond its block timeout before the
/// client gives up on the response
pub const BLOCKING_READ_GRACE: Duration = Duration::from_secs(5);

/// Connect to Redis for publishing and one-shot commands
///
/// The ConnectionManager reconnects on its own after a dropped connection.
/// The connection is verified with PING before returning.
pub async fn connect(url: &str) -> Result<ConnectionManager, StreamError> {
    connect_with_config(url, ConnectionManagerConfig::new()).await
}

/// Connect to Redis for a single stream consumer
///
/// The returned connection must not be shared with producers or health
/// checks: while a read blocks, nothing else on it gets an answer.
pub async fn connect_consumer(
    url: &str,
    config: &StreamConfig,
) -> Result<ConnectionManager, StreamError> {
    connect_with_config(url, consumer_connection_config(config)).await
}

/// [`connect`], retrying start-up failures with exponential backoff
///
/// Delays start at 200ms and double up to 5s. Only used at start-up; once the
/// worker runs, transport errors are fatal.
pub async fn connect_with_retry(
    url: &str,
    max_retries: u32,
) -> Result<ConnectionManager, StreamError> {
    with_retry(max_retries, "command", || connect(url)).await
}

/// [`connect_consumer`], retrying start-up failures like [`connect_with_retry`]
pub async fn connect_consumer_with_retry(
    url: &str,
    config: &StreamConfig,
    max_retries: u32,
) -> Result<ConnectionManager, StreamError> {
    with_retry(max_retries, "consumer", || connect_consumer(url, config)).await
}

/// Response timeout long enough for one blocking read of `config`
pub(crate) fn consumer_connection_config(config: &StreamConfig) -> ConnectionManagerConfig {
    let base = ConnectionManagerConfig::new();
    match config.block_timeout_ms {
        Some(block_ms) => base
            .set_response_timeout(Some(Duration::from_millis(block_ms) + BLOCKING_READ_GRACE)),
        None => base,
    }
}

async fn connect_with_config(
    url: &str,
    config: ConnectionManagerConfig,
) -> Result<ConnectionManager, StreamError> {
    let client = Client::open(url)?;
    let manager = ConnectionManager::new_with_config(client, config).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    Ok(manager)
}

async fn with_retry<F, Fut>(
    max_retries: u32,
    role: &'static str,
    mut connect: F,
) -> Result<ConnectionManager, StreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ConnectionManager, StreamError>>,
{
    let mut attempt = 0;
    let mut delay_ms: u64 = 200;

    loop {
        match connect().await {
            Ok(manager) => {
                info!(attempt = attempt + 1, role, "Connected to Redis");
                return Ok(manager);
            }
            Err(e) if attempt < max_retries => {
                attempt += 1;
                warn!(
                    error = %e,
                    attempt,
                    max_retries,
                    delay_ms,
                    role,
                    "Redis connection failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = (delay_ms * 2).min(5_000);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::FakeRedis;

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let result = connect("not-a-redis-url").await;
        assert!(matches!(result, Err(StreamError::Redis(_))));
    }

    #[test]
    fn test_consumer_timeout_outlasts_block() {
        let config = StreamConfig::new("s", "g").with_blocking(Some(1_000));
        let timeout = consumer_connection_config(&config).response_timeout();

        assert_eq!(timeout, Some(Duration::from_millis(1_000) + BLOCKING_READ_GRACE));
    }

    #[test]
    fn test_non_blocking_consumer_keeps_defaults() {
        let config = StreamConfig::new("s", "g").with_blocking(None);

        assert_eq!(
            consumer_connection_config(&config).response_timeout(),
            ConnectionManagerConfig::new().response_timeout()
        );
    }

    #[tokio::test]
    async fn test_connect_both_roles() {
        let fake = FakeRedis::start().await;
        let config = StreamConfig::new("s", "g");

        assert!(connect_with_retry(&fake.url(), 0).await.is_ok());
        assert!(connect_consumer_with_retry(&fake.url(), &config, 0).await.is_ok());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_connect_to_container() {
        let redis = test_utils::TestRedis::new().await;
        let manager = connect(redis.connection_string()).await;
        assert!(manager.is_ok());
    }
}
