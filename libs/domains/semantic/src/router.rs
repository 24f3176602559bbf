//! Message router for the inbound stream.
//!
//! Reads one entry at a time, classifies it by `type` and runs the insert or
//! search pipeline. Search requests always get exactly one response on the
//! outbound stream, success or error. Insert failures are logged and dropped.
//!
//! Per-message failures (embedding, index, schema) never stop the loop.
//! Transport failures do: they propagate out of [`MessageRouter::run`].

use std::sync::Arc;
use std::time::Instant;

use stream_worker::{MessageSink, MessageSource, StreamError, StreamEvent, StreamMetrics};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::correlator;
use crate::embedding::EmbeddingGateway;
use crate::error::{ErrorKind, SemanticError, SemanticResult};
use crate::index::VectorIndexGateway;
use crate::models::{
    InboundMessage, IndexPoint, InsertRequest, Rejection, ResultEnvelope, SearchHit,
    SearchRequest,
};

pub const DEFAULT_SEARCH_LIMIT: u64 = 3;

/// Everything a pipeline needs, built once at start-up
#[derive(Clone)]
pub struct RouterContext {
    pub embeddings: EmbeddingGateway,
    pub index: VectorIndexGateway,
    pub sink: Arc<dyn MessageSink>,
    pub search_limit: u64,
}

impl RouterContext {
    pub fn new(
        embeddings: EmbeddingGateway,
        index: VectorIndexGateway,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            embeddings,
            index,
            sink,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, limit: u64) -> Self {
        self.search_limit = limit;
        self
    }
}

/// How a single inbound message ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A new point was written
    Inserted { id: Uuid },
    /// Insert failed at `error` and was dropped
    InsertDropped { error: ErrorKind },
    /// A search response was published
    Responded {
        request_id: Option<String>,
        status: &'static str,
    },
    /// Unknown or missing `type`
    Ignored { kind: Option<String> },
    /// Undecodable payload; `answered` when an error envelope was still published
    Rejected { error: ErrorKind, answered: bool },
}

impl Outcome {
    /// Metrics label
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Inserted { .. } => "inserted",
            Outcome::InsertDropped { .. } => "insert_dropped",
            Outcome::Responded { status, .. } => {
                if *status == "success" {
                    "responded"
                } else {
                    "responded_error"
                }
            }
            Outcome::Ignored { .. } => "ignored",
            Outcome::Rejected { .. } => "rejected",
        }
    }
}

pub struct MessageRouter {
    source: Arc<dyn MessageSource>,
    ctx: RouterContext,
    metrics: StreamMetrics,
}

impl MessageRouter {
    pub fn new(
        source: Arc<dyn MessageSource>,
        ctx: RouterContext,
        stream_name: impl Into<String>,
    ) -> Self {
        Self {
            source,
            ctx,
            metrics: StreamMetrics::new(stream_name, "semantic_router"),
        }
    }

    /// Consume until shutdown is signalled or the source closes.
    ///
    /// Shutdown is only observed while waiting for the next message; a message
    /// that has been read is always handled and acknowledged first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> SemanticResult<()> {
        info!(search_limit = self.ctx.search_limit, "Message router started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                received = self.source.recv() => received,
            };

            match received {
                Ok(Some(event)) => {
                    self.process(event).await?;
                }
                Ok(None) => continue,
                Err(StreamError::Closed) => {
                    info!("Inbound source closed");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("Message router stopped");
        Ok(())
    }

    /// Receive, handle and acknowledge at most one message
    pub async fn poll_once(&self) -> SemanticResult<Option<Outcome>> {
        match self.source.recv().await? {
            Some(event) => Ok(Some(self.process(event).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, event), fields(stream_id = %event.stream_id, redelivered = event.redelivered))]
    async fn process(&self, event: StreamEvent) -> SemanticResult<Outcome> {
        let outcome = self.handle(&event.payload).await?;
        self.source.ack(&event).await?;
        Ok(outcome)
    }

    /// Classify one raw payload and run its pipeline.
    ///
    /// Only transport errors are returned; everything else is an [`Outcome`].
    pub async fn handle(&self, raw: &str) -> SemanticResult<Outcome> {
        let started = Instant::now();

        let (kind, outcome) = match InboundMessage::decode(raw) {
            Ok(message) => {
                let kind = message.kind();
                self.metrics.message_received(kind);

                let outcome = match message {
                    InboundMessage::Insert(request) => self.insert(request).await,
                    InboundMessage::Search(request) => self.search(request).await?,
                    InboundMessage::Ignored { kind } => {
                        debug!(kind = ?kind, "Ignoring message with unrecognised type");
                        Outcome::Ignored { kind }
                    }
                };
                (kind, outcome)
            }
            Err(rejection) => {
                self.metrics.message_received("invalid");
                ("invalid", self.reject(rejection).await?)
            }
        };

        self.metrics
            .message_handled(kind, outcome.label(), started.elapsed());
        Ok(outcome)
    }

    async fn insert(&self, request: InsertRequest) -> Outcome {
        match self.try_insert(&request.content).await {
            Ok(id) => {
                info!(point_id = %id, "Inserted text");
                Outcome::Inserted { id }
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind().as_str(), "Insert failed, dropping message");
                self.metrics.pipeline_failed("insert", e.kind().as_str());
                Outcome::InsertDropped { error: e.kind() }
            }
        }
    }

    async fn try_insert(&self, content: &str) -> SemanticResult<Uuid> {
        let vector = self.ctx.embeddings.embed(content).await?;
        self.ctx.index.upsert(IndexPoint::new(vector, content)).await
    }

    async fn search(&self, request: SearchRequest) -> SemanticResult<Outcome> {
        let envelope = match self.try_search(&request.content).await {
            Ok(hits) => {
                info!(
                    request_id = ?request.request_id,
                    hits = hits.len(),
                    "Search completed"
                );
                ResultEnvelope::success(hits)
            }
            Err(e) => {
                warn!(
                    request_id = ?request.request_id,
                    error = %e,
                    kind = e.kind().as_str(),
                    "Search failed, replying with error"
                );
                self.metrics.pipeline_failed("search", e.kind().as_str());
                ResultEnvelope::error(e.to_string())
            }
        };

        let status = envelope.status();
        self.respond(request.request_id.clone(), envelope).await?;

        Ok(Outcome::Responded {
            request_id: request.request_id,
            status,
        })
    }

    async fn try_search(&self, content: &str) -> SemanticResult<Vec<SearchHit>> {
        let vector = self.ctx.embeddings.embed(content).await?;
        self.ctx.index.search(vector, self.ctx.search_limit).await
    }

    async fn reject(&self, rejection: Rejection) -> SemanticResult<Outcome> {
        let error = rejection.error().kind();
        warn!(error = %rejection.error(), "Rejected inbound payload");
        self.metrics.pipeline_failed("invalid", error.as_str());

        match rejection {
            Rejection::Drop(_) => Ok(Outcome::Rejected {
                error,
                answered: false,
            }),
            Rejection::Answer {
                request_id,
                error: cause,
            } => {
                self.respond(request_id, ResultEnvelope::error(cause.to_string()))
                    .await?;
                Ok(Outcome::Rejected {
                    error,
                    answered: true,
                })
            }
        }
    }

    async fn respond(
        &self,
        request_id: Option<String>,
        envelope: ResultEnvelope,
    ) -> SemanticResult<()> {
        let response = correlator::wrap(request_id, envelope);
        let payload =
            serde_json::to_string(&response).map_err(|e| SemanticError::Transport(e.into()))?;

        let entry_id = self.ctx.sink.publish(&payload).await?;
        self.metrics.response_published();
        debug!(entry_id = %entry_id, request_id = ?response.request_id, "Published response");
        Ok(())
    }
}
