use std::sync::Arc;

use tracing::debug;

use super::EmbeddingProvider;
use crate::error::{SemanticError, SemanticResult};
use crate::models::Embedding;

/// Text → embedding, with the vector length pinned for the process lifetime
#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimension: usize) -> Self {
        Self {
            provider,
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Embed one text; a vector of any other length than `dimension` is an error
    pub async fn embed(&self, text: &str) -> SemanticResult<Embedding> {
        let vector = self.provider.embed(text).await?;

        if vector.len() != self.dimension {
            return Err(SemanticError::Embedding(format!(
                "{} returned {} dimensions, expected {}",
                self.provider.name(),
                vector.len(),
                self.dimension
            )));
        }

        debug!(
            provider = self.provider.name(),
            chars = text.len(),
            "Embedded text"
        );
        Ok(vector)
    }
}
