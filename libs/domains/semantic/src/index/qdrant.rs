use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    PointStruct, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    value::Kind,
};
use tracing::warn;

use super::{QdrantConfig, VectorIndex};
use crate::error::{SemanticError, SemanticResult};
use crate::models::{Embedding, IndexPoint, SearchHit};

const TEXT_FIELD: &str = "text";

/// Qdrant-backed implementation of VectorIndex
///
/// The collection is provisioned outside this service; its vector size must
/// match the embedding dimension.
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
}

impl QdrantIndex {
    pub fn new(config: QdrantConfig) -> SemanticResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| SemanticError::Config(format!("Failed to build Qdrant client: {}", e)))?;

        Ok(Self {
            client,
            collection: config.collection,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn to_point(point: IndexPoint) -> PointStruct {
        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        payload.insert(TEXT_FIELD.to_string(), QdrantValue::from(point.payload.text));

        PointStruct::new(point.id.to_string(), point.vector, payload)
    }

    fn to_hit(point: ScoredPoint) -> Option<SearchHit> {
        let text = point.payload.get(TEXT_FIELD).and_then(|v| match &v.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        });

        match text {
            Some(text) => Some(SearchHit {
                text,
                score: point.score,
            }),
            None => {
                warn!(point_id = ?point.id, "Skipping point without a text payload");
                None
            }
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, point: IndexPoint) -> SemanticResult<()> {
        let builder =
            UpsertPointsBuilder::new(&self.collection, vec![Self::to_point(point)]).wait(true);

        self.client.upsert_points(builder).await?;
        Ok(())
    }

    async fn search(&self, vector: Embedding, limit: u64) -> SemanticResult<Vec<SearchHit>> {
        let builder = SearchPointsBuilder::new(&self.collection, vector, limit).with_payload(true);

        let response = self.client.search_points(builder).await?;

        Ok(response.result.into_iter().filter_map(Self::to_hit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::PointId;

    fn scored(payload: HashMap<String, QdrantValue>, score: f32) -> ScoredPoint {
        ScoredPoint {
            id: Some(PointId::from(uuid::Uuid::new_v4().to_string())),
            payload,
            score,
            ..Default::default()
        }
    }

    #[test]
    fn test_point_carries_text_payload() {
        let point = IndexPoint::new(vec![0.1, 0.2], "hello world");
        let id = point.id.to_string();

        let qdrant_point = QdrantIndex::to_point(point);

        assert_eq!(qdrant_point.id, Some(PointId::from(id)));
        let text = qdrant_point.payload.get(TEXT_FIELD).unwrap();
        assert_eq!(text.kind, Some(Kind::StringValue("hello world".to_string())));
    }

    #[test]
    fn test_hit_from_scored_point() {
        let mut payload = HashMap::new();
        payload.insert(TEXT_FIELD.to_string(), QdrantValue::from("hello world".to_string()));

        let hit = QdrantIndex::to_hit(scored(payload, 0.98)).unwrap();
        assert_eq!(hit.text, "hello world");
        assert_eq!(hit.score, 0.98);
    }

    #[test]
    fn test_points_without_text_are_skipped() {
        assert!(QdrantIndex::to_hit(scored(HashMap::new(), 0.5)).is_none());

        let mut payload = HashMap::new();
        payload.insert(TEXT_FIELD.to_string(), QdrantValue::from(42_i64));
        assert!(QdrantIndex::to_hit(scored(payload, 0.5)).is_none());
    }

    #[tokio::test]
    async fn test_client_builds_without_connecting() {
        let index = QdrantIndex::new(QdrantConfig::default()).unwrap();
        assert_eq!(index.collection(), "text_embeddings");
    }
}
