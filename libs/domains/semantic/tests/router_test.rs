//! End-to-end router behaviour over in-memory transport, embedder and index.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain_semantic::{
    Embedding, EmbeddingGateway, EmbeddingProvider, IndexPoint, MessageRouter, Outcome,
    ResultEnvelope, RouterContext, SearchHit, SearchResponse, SemanticError, SemanticResult,
    VectorIndex, VectorIndexGateway,
};
use serde_json::json;
use stream_worker::{MessageSink, MessageSource, StreamError, StreamEvent};
use tokio::sync::watch;

const DIMENSION: usize = 384;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct VecSource {
    pending: Mutex<VecDeque<StreamEvent>>,
    acked: Mutex<Vec<String>>,
}

impl VecSource {
    fn new(payloads: &[String]) -> Self {
        let pending = payloads
            .iter()
            .enumerate()
            .map(|(i, p)| StreamEvent::new(format!("1700000000000-{}", i), p.clone()))
            .collect();
        Self {
            pending: Mutex::new(pending),
            acked: Mutex::new(Vec::new()),
        }
    }

    fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSource for VecSource {
    async fn recv(&self) -> Result<Option<StreamEvent>, StreamError> {
        self.pending
            .lock()
            .unwrap()
            .pop_front()
            .map(Some)
            .ok_or(StreamError::Closed)
    }

    async fn ack(&self, event: &StreamEvent) -> Result<(), StreamError> {
        self.acked.lock().unwrap().push(event.stream_id.clone());
        Ok(())
    }
}

#[derive(Default)]
struct VecSink {
    published: Mutex<Vec<String>>,
}

impl VecSink {
    fn responses(&self) -> Vec<SearchResponse> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|p| serde_json::from_str(p).unwrap())
            .collect()
    }
}

#[async_trait]
impl MessageSink for VecSink {
    async fn publish(&self, payload: &str) -> Result<String, StreamError> {
        let mut published = self.published.lock().unwrap();
        published.push(payload.to_string());
        Ok(format!("1700000000001-{}", published.len()))
    }
}

struct FailingSink;

#[async_trait]
impl MessageSink for FailingSink {
    async fn publish(&self, _payload: &str) -> Result<String, StreamError> {
        Err(StreamError::Config("broker gone".into()))
    }
}

/// Bag-of-words hashed into a fixed number of buckets, L2-normalised.
struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    async fn embed(&self, text: &str) -> SemanticResult<Embedding> {
        let mut vector = vec![0.0_f32; DIMENSION];
        for word in text.split_whitespace() {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
                });
            vector[(bucket % DIMENSION as u64) as usize] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> SemanticResult<Embedding> {
        Err(SemanticError::Embedding("model not loaded".into()))
    }
}

#[derive(Default)]
struct MemoryIndex {
    points: Mutex<Vec<IndexPoint>>,
}

impl MemoryIndex {
    fn points(&self) -> Vec<IndexPoint> {
        self.points.lock().unwrap().clone()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, point: IndexPoint) -> SemanticResult<()> {
        self.points.lock().unwrap().push(point);
        Ok(())
    }

    async fn search(&self, vector: Embedding, limit: u64) -> SemanticResult<Vec<SearchHit>> {
        let mut hits: Vec<SearchHit> = self
            .points
            .lock()
            .unwrap()
            .iter()
            .map(|p| SearchHit {
                text: p.payload.text.clone(),
                score: cosine(&vector, &p.vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit as usize);
        Ok(hits)
    }
}

struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn upsert(&self, _point: IndexPoint) -> SemanticResult<()> {
        Err(SemanticError::Index("collection text_embeddings not found".into()))
    }

    async fn search(&self, _vector: Embedding, _limit: u64) -> SemanticResult<Vec<SearchHit>> {
        Err(SemanticError::Index("collection text_embeddings not found".into()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    router: MessageRouter,
    source: Arc<VecSource>,
    sink: Arc<VecSink>,
    index: Arc<MemoryIndex>,
}

fn harness(payloads: &[String]) -> Harness {
    harness_with(payloads, Arc::new(HashEmbedder))
}

fn harness_with(payloads: &[String], embedder: Arc<dyn EmbeddingProvider>) -> Harness {
    let source = Arc::new(VecSource::new(payloads));
    let sink = Arc::new(VecSink::default());
    let index = Arc::new(MemoryIndex::default());

    let ctx = RouterContext::new(
        EmbeddingGateway::new(embedder, DIMENSION),
        VectorIndexGateway::new(index.clone()),
        sink.clone(),
    );

    Harness {
        router: MessageRouter::new(source.clone(), ctx, "text-topic"),
        source,
        sink,
        index,
    }
}

async fn run_to_end(router: &MessageRouter) {
    let (_tx, rx) = watch::channel(false);
    router.run(rx).await.unwrap();
}

fn insert(content: &str) -> String {
    json!({"type": "insert", "content": content}).to_string()
}

fn search(content: &str, request_id: Option<&str>) -> String {
    match request_id {
        Some(id) => json!({"type": "search", "content": content, "request_id": id}).to_string(),
        None => json!({"type": "search", "content": content}).to_string(),
    }
}

fn hits(response: &SearchResponse) -> &[SearchHit] {
    match &response.results {
        ResultEnvelope::Success { results } => results,
        ResultEnvelope::Error { message } => panic!("expected success, got error: {}", message),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_insert_writes_one_point_and_no_response() {
    let h = harness(&[insert("the quick brown fox")]);

    run_to_end(&h.router).await;

    let points = h.index.points();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].payload.text, "the quick brown fox");
    assert_eq!(points[0].vector.len(), DIMENSION);
    assert!(h.sink.responses().is_empty());
}

#[tokio::test]
async fn test_every_search_gets_its_request_id_back() {
    let h = harness(&[
        search("alpha", Some("req-1")),
        search("beta", None),
        search("gamma", Some("")),
    ]);

    run_to_end(&h.router).await;

    let ids: Vec<_> = h.sink.responses().into_iter().map(|r| r.request_id).collect();
    assert_eq!(ids, vec![Some("req-1".to_string()), None, Some(String::new())]);
}

#[tokio::test]
async fn test_absent_request_id_is_published_as_null() {
    let h = harness(&[search("anything", None)]);

    run_to_end(&h.router).await;

    let raw = h.sink.published.lock().unwrap()[0].clone();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value["request_id"].is_null());
    assert_eq!(value["results"]["status"], "success");
}

#[tokio::test]
async fn test_results_are_capped_and_ordered() {
    let mut payloads: Vec<String> = [
        "rust async runtime",
        "rust borrow checker",
        "rust traits and generics",
        "python asyncio",
        "rust macros",
    ]
    .iter()
    .map(|t| insert(t))
    .collect();
    payloads.push(search("rust", Some("q")));
    let h = harness(&payloads);

    run_to_end(&h.router).await;

    let responses = h.sink.responses();
    assert_eq!(responses.len(), 1);
    let results = hits(&responses[0]);
    assert_eq!(results.len(), 3);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_insert_then_search_finds_exact_text_first() {
    let h = harness(&[
        insert("goodbye moon"),
        insert("hello world"),
        insert("hello there"),
        search("hello world", Some("rt")),
    ]);

    run_to_end(&h.router).await;

    let responses = h.sink.responses();
    let results = hits(&responses[0]);
    assert_eq!(results[0].text, "hello world");
    assert!(results.iter().skip(1).all(|r| r.score < results[0].score));
}

#[tokio::test]
async fn test_unknown_type_has_no_effect() {
    let h = harness(&[json!({"type": "update", "content": "x"}).to_string()]);

    run_to_end(&h.router).await;

    assert!(h.index.points().is_empty());
    assert!(h.sink.responses().is_empty());
    assert_eq!(h.source.acked().len(), 1);
}

#[tokio::test]
async fn test_duplicate_inserts_create_distinct_points() {
    let h = harness(&[insert("same text"), insert("same text")]);

    run_to_end(&h.router).await;

    let points = h.index.points();
    assert_eq!(points.len(), 2);
    assert_ne!(points[0].id, points[1].id);
    assert_eq!(points[0].payload, points[1].payload);
}

#[tokio::test]
async fn test_search_on_empty_index_succeeds_with_no_results() {
    let h = harness(&[search("anything", Some("empty"))]);

    run_to_end(&h.router).await;

    let responses = h.sink.responses();
    assert_eq!(responses[0].results, ResultEnvelope::success(vec![]));
}

#[tokio::test]
async fn test_embedding_failure_on_insert_is_silent() {
    let h = harness_with(&[insert("doomed")], Arc::new(FailingEmbedder));

    run_to_end(&h.router).await;

    assert!(h.index.points().is_empty());
    assert!(h.sink.responses().is_empty());
    assert_eq!(h.source.acked().len(), 1);
}

#[tokio::test]
async fn test_embedding_failure_on_search_is_reported() {
    let h = harness_with(&[search("q", Some("e1"))], Arc::new(FailingEmbedder));

    run_to_end(&h.router).await;

    let responses = h.sink.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(
        responses[0].results,
        ResultEnvelope::error("Embedding error: model not loaded")
    );
}

#[tokio::test]
async fn test_index_failure_on_search_publishes_one_error() {
    let source = Arc::new(VecSource::new(&[search("q", Some("i1")), insert("x")]));
    let sink = Arc::new(VecSink::default());
    let ctx = RouterContext::new(
        EmbeddingGateway::new(Arc::new(HashEmbedder), DIMENSION),
        VectorIndexGateway::new(Arc::new(FailingIndex)),
        sink.clone(),
    );
    let router = MessageRouter::new(source.clone(), ctx, "text-topic");

    run_to_end(&router).await;

    let responses = sink.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].request_id.as_deref(), Some("i1"));
    assert!(matches!(
        &responses[0].results,
        ResultEnvelope::Error { message } if message.contains("text_embeddings")
    ));
    assert_eq!(source.acked().len(), 2);
}

#[tokio::test]
async fn test_malformed_json_is_dropped_and_loop_continues() {
    let h = harness(&["{\"type\": \"insert\", ".to_string(), insert("after the bad one")]);

    run_to_end(&h.router).await;

    assert!(h.sink.responses().is_empty());
    let points = h.index.points();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].payload.text, "after the bad one");
    assert_eq!(h.source.acked().len(), 2);
}

#[tokio::test]
async fn test_responses_follow_consumption_order() {
    let h = harness(&[
        search("one", Some("1")),
        insert("between"),
        search("two", Some("2")),
        search("three", Some("3")),
    ]);

    run_to_end(&h.router).await;

    let ids: Vec<_> = h
        .sink
        .responses()
        .into_iter()
        .filter_map(|r| r.request_id)
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(
        h.source.acked(),
        vec![
            "1700000000000-0",
            "1700000000000-1",
            "1700000000000-2",
            "1700000000000-3"
        ]
    );
}

#[tokio::test]
async fn test_poll_once_handles_a_single_message() {
    let h = harness(&[insert("first"), insert("second")]);

    let outcome = h.router.poll_once().await.unwrap();

    assert!(matches!(outcome, Some(Outcome::Inserted { .. })));
    assert_eq!(h.index.points().len(), 1);
    assert_eq!(h.source.acked(), vec!["1700000000000-0"]);
}

#[tokio::test]
async fn test_publish_failure_is_fatal_and_leaves_message_unacked() {
    let source = Arc::new(VecSource::new(&[search("q", Some("lost"))]));
    let ctx = RouterContext::new(
        EmbeddingGateway::new(Arc::new(HashEmbedder), DIMENSION),
        VectorIndexGateway::new(Arc::new(MemoryIndex::default())),
        Arc::new(FailingSink),
    );
    let router = MessageRouter::new(source.clone(), ctx, "text-topic");
    let (_tx, rx) = watch::channel(false);

    let err = router.run(rx).await.unwrap_err();

    assert!(matches!(err, SemanticError::Transport(_)));
    assert!(source.acked().is_empty());
}

#[tokio::test]
async fn test_shutdown_stops_before_reading() {
    let h = harness(&[insert("never read")]);
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    h.router.run(rx).await.unwrap();

    assert!(h.index.points().is_empty());
    assert!(h.source.acked().is_empty());
}

#[tokio::test]
async fn test_search_limit_is_configurable_at_startup() {
    let source = Arc::new(VecSource::new(&[
        insert("a b"),
        insert("a c"),
        insert("a d"),
        search("a", Some("one")),
    ]));
    let sink = Arc::new(VecSink::default());
    let ctx = RouterContext::new(
        EmbeddingGateway::new(Arc::new(HashEmbedder), DIMENSION),
        VectorIndexGateway::new(Arc::new(MemoryIndex::default())),
        sink.clone(),
    )
    .with_search_limit(1);
    let router = MessageRouter::new(source, ctx, "text-topic");

    run_to_end(&router).await;

    assert_eq!(hits(&sink.responses()[0]).len(), 1);
}
