//! Transport error types
//!
//! Everything that can go wrong between the worker and Redis. Callers treat
//! these as fatal; the only benign case is a blocking read that timed out,
//! which the consumer turns into "no message".

use thiserror::Error;

/// Stream transport errors
#[derive(Error, Debug)]
pub enum StreamError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Serialization error for an outbound payload
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source has no more messages and never will (in-memory sources in tests)
    #[error("Stream closed")]
    Closed,
}

impl StreamError {
    /// Consumer group missing (stream key deleted underneath us)
    pub fn is_nogroup_error(&self) -> bool {
        matches!(self, StreamError::Redis(e) if e.to_string().contains("NOGROUP"))
    }

    /// Client-side timeout on a command, e.g. a BLOCK read outliving the response timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, StreamError::Redis(e) if e.is_timeout())
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Serialization(err.to_string())
    }
}
