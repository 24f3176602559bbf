use async_trait::async_trait;

use crate::error::SemanticResult;
use crate::models::Embedding;

/// Trait for embedding generation providers
///
/// Implementations wrap one model; every call returns a vector of the same length.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Generate the embedding for a single text
    async fn embed(&self, text: &str) -> SemanticResult<Embedding>;
}
