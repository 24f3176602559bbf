use stream_worker::StreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("Transport error: {0}")]
    Transport(#[from] StreamError),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Invalid message: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type SemanticResult<T> = Result<T, SemanticError>;

/// Coarse error category, used to pick drop-vs-report and as a metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Embedding,
    Index,
    Schema,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Embedding => "embedding",
            ErrorKind::Index => "index",
            ErrorKind::Schema => "schema",
            ErrorKind::Config => "config",
        }
    }
}

impl SemanticError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SemanticError::Transport(_) => ErrorKind::Transport,
            SemanticError::Embedding(_) => ErrorKind::Embedding,
            SemanticError::Index(_) => ErrorKind::Index,
            SemanticError::Schema(_) => ErrorKind::Schema,
            SemanticError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<qdrant_client::QdrantError> for SemanticError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        SemanticError::Index(err.to_string())
    }
}

impl From<reqwest::Error> for SemanticError {
    fn from(err: reqwest::Error) -> Self {
        SemanticError::Embedding(err.to_string())
    }
}

impl From<serde_json::Error> for SemanticError {
    fn from(err: serde_json::Error) -> Self {
        SemanticError::Schema(err.to_string())
    }
}

impl From<core_config::ConfigError> for SemanticError {
    fn from(err: core_config::ConfigError) -> Self {
        SemanticError::Config(err.to_string())
    }
}
