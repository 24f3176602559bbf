use std::str::FromStr;
use std::sync::Arc;

use core_config::{ConfigError, FromEnv, env_or_default, env_parse};

use super::{EmbeddingGateway, EmbeddingProvider, OpenAIConfig, OpenAIProvider};
use crate::error::{SemanticError, SemanticResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8081/v1";
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_DIMENSION: usize = 384;

/// Which embedding backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    OpenAI,
    FastEmbed,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" | "http" => Ok(ProviderKind::OpenAI),
            "fastembed" | "local" => Ok(ProviderKind::FastEmbed),
            other => Err(format!(
                "unknown embedding provider '{}', expected 'openai' or 'fastembed'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAI,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl FromEnv for EmbeddingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let provider = env_parse("EMBEDDING_PROVIDER", ProviderKind::OpenAI)?;

        let api_key = std::env::var("EMBEDDING_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|key| !key.is_empty());

        let dimension = env_parse("EMBEDDING_DIMENSION", DEFAULT_DIMENSION)?;
        if dimension == 0 {
            return Err(ConfigError::InvalidValue {
                key: "EMBEDDING_DIMENSION".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            provider,
            base_url: env_or_default("EMBEDDING_BASE_URL", DEFAULT_BASE_URL),
            api_key,
            model: env_or_default("EMBEDDING_MODEL", DEFAULT_MODEL),
            dimension,
        })
    }
}

impl EmbeddingConfig {
    pub fn build_provider(&self) -> SemanticResult<Arc<dyn EmbeddingProvider>> {
        match self.provider {
            ProviderKind::OpenAI => {
                let mut config = OpenAIConfig::new(&self.base_url, &self.model);
                if let Some(api_key) = &self.api_key {
                    config = config.with_api_key(api_key);
                }
                Ok(Arc::new(OpenAIProvider::new(config)?))
            }
            #[cfg(feature = "fastembed")]
            ProviderKind::FastEmbed => Ok(Arc::new(super::FastEmbedProvider::new()?)),
            #[cfg(not(feature = "fastembed"))]
            ProviderKind::FastEmbed => Err(SemanticError::Config(
                "EMBEDDING_PROVIDER=fastembed requires the 'fastembed' feature".to_string(),
            )),
        }
    }

    pub fn build_gateway(&self) -> SemanticResult<EmbeddingGateway> {
        Ok(EmbeddingGateway::new(self.build_provider()?, self.dimension))
    }
}
