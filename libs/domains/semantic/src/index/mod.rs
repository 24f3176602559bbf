mod config;
mod gateway;
mod qdrant;

use async_trait::async_trait;

use crate::error::SemanticResult;
use crate::models::{Embedding, IndexPoint, SearchHit};

pub use config::QdrantConfig;
pub use gateway::VectorIndexGateway;
pub use qdrant::QdrantIndex;

/// Vector store holding one collection of text points
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Write a single point, waiting until it is searchable
    async fn upsert(&self, point: IndexPoint) -> SemanticResult<()>;

    /// Up to `limit` nearest points by the collection's metric
    async fn search(&self, vector: Embedding, limit: u64) -> SemanticResult<Vec<SearchHit>>;
}
