use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::VectorIndex;
use crate::error::SemanticResult;
use crate::models::{Embedding, IndexPoint, SearchHit};

/// Upsert and ranked search over the configured index.
///
/// Search keeps the index's own ranking, which is best-first for whatever
/// distance the collection uses, and never returns more than the requested
/// limit.
#[derive(Clone)]
pub struct VectorIndexGateway {
    index: Arc<dyn VectorIndex>,
}

impl VectorIndexGateway {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    pub async fn upsert(&self, point: IndexPoint) -> SemanticResult<Uuid> {
        let id = point.id;
        self.index.upsert(point).await?;
        debug!(point_id = %id, "Upserted point");
        Ok(id)
    }

    pub async fn search(&self, vector: Embedding, limit: u64) -> SemanticResult<Vec<SearchHit>> {
        let mut hits = self.index.search(vector, limit).await?;
        hits.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        debug!(hits = hits.len(), limit, "Searched index");
        Ok(hits)
    }
}
