//! Redis test infrastructure
//!
//! Provides a `TestRedis` helper that creates a Redis container for testing.

use redis::Client;
use redis::aio::ConnectionManager;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

/// Test Redis wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
pub struct TestRedis {
    #[allow(dead_code)]
    container: ContainerAsync<Redis>,
    client: Client,
    connection_string: String,
}

impl TestRedis {
    /// Create a new test Redis instance
    ///
    /// Uses the Redis 8 Alpine image; streams and consumer groups need 5.0+.
    pub async fn new() -> Self {
        let container = Redis::default()
            .with_tag("8-alpine")
            .start()
            .await
            .expect("Failed to start Redis container");

        let host_port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let connection_string = format!("redis://127.0.0.1:{}", host_port);

        let client =
            Client::open(connection_string.clone()).expect("Failed to create Redis client");

        tracing::info!(port = host_port, "Test Redis ready (Redis 8-alpine)");

        Self {
            container,
            client,
            connection_string,
        }
    }

    /// Open a reconnecting connection (the type the stream transport uses)
    pub async fn manager(&self) -> ConnectionManager {
        ConnectionManager::new(self.client.clone())
            .await
            .expect("Failed to connect to Redis")
    }

    /// Get the connection string for manual client creation
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

impl Drop for TestRedis {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Redis container");
    }
}
