use core_config::{ConfigError, FromEnv, env_or_default, env_parse};

pub const DEFAULT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "text_embeddings";

/// Qdrant connection configuration
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub collection: String,
}

impl QdrantConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

impl FromEnv for QdrantConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_or_default("QDRANT_URL", DEFAULT_URL),
            api_key: std::env::var("QDRANT_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            timeout_secs: env_parse("QDRANT_TIMEOUT_SECS", 30)?,
            collection: env_or_default("QDRANT_COLLECTION", DEFAULT_COLLECTION),
        })
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_key: None,
            timeout_secs: 30,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}
