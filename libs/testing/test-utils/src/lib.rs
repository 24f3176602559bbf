//! Shared test utilities
//!
//! - `TestRedis`: Redis container with automatic cleanup (feature: "redis")
//! - `FakeRedis`: in-process stream server for tests without Docker (feature: "redis")
//!
//! # Usage
//!
//! Add `features = ["redis"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["redis"] }
//! ```
//!
//! Then in your tests:
//!
//! ```rust,ignore
//! use test_utils::TestRedis;
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn my_stream_test() {
//!     let redis = TestRedis::new().await;
//!     let manager = redis.manager().await;
//!     // hand `manager` to a StreamConsumer / StreamProducer
//! }
//! ```

#[cfg(feature = "redis")]
mod fake_redis;
#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "redis")]
pub use fake_redis::FakeRedis;
#[cfg(feature = "redis")]
pub use redis::TestRedis;
