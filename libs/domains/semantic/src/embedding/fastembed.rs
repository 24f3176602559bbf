use std::sync::Arc;

use async_trait::async_trait;
use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use super::EmbeddingProvider;
use crate::error::{SemanticError, SemanticResult};
use crate::models::Embedding;

/// In-process all-MiniLM-L6-v2 (384 dimensions) via ONNX Runtime
///
/// The model is downloaded on first use and cached by fastembed.
pub struct FastEmbedProvider {
    model: Arc<TextEmbedding>,
}

impl FastEmbedProvider {
    pub fn new() -> SemanticResult<Self> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| SemanticError::Config(format!("Failed to load embedding model: {}", e)))?;

        info!(model = "all-MiniLM-L6-v2", "Loaded local embedding model");
        Ok(Self {
            model: Arc::new(model),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn name(&self) -> &'static str {
        "fastembed"
    }

    async fn embed(&self, text: &str) -> SemanticResult<Embedding> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();

        // Inference is CPU-bound
        let embeddings = tokio::task::spawn_blocking(move || model.embed(vec![text], None))
            .await
            .map_err(|e| SemanticError::Embedding(format!("Embedding task failed: {}", e)))?
            .map_err(|e| SemanticError::Embedding(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| SemanticError::Embedding("No embedding returned".to_string()))
    }
}
