mod config;
#[cfg(feature = "fastembed")]
mod fastembed;
mod gateway;
mod openai;
mod provider;

pub use config::{EmbeddingConfig, ProviderKind};
#[cfg(feature = "fastembed")]
pub use self::fastembed::FastEmbedProvider;
pub use gateway::EmbeddingGateway;
pub use openai::{OpenAIConfig, OpenAIProvider};
pub use provider::EmbeddingProvider;

#[cfg(test)]
pub use provider::MockEmbeddingProvider;
