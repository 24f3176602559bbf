//! Semantic Domain Library
//!
//! Turns a stream of `insert` / `search` requests into writes and ranked
//! queries against a vector index, publishing one correlated response per
//! search.
//!
//! # Architecture
//!
//! ```text
//!   MessageSource ──► MessageRouter ──► MessageSink
//!                      │        │          ▲
//!                      ▼        ▼          │
//!          EmbeddingGateway  VectorIndexGateway
//!                 │                 │      correlator::wrap
//!       EmbeddingProvider      VectorIndex
//!         (trait)                (trait)
//!                 │                 │
//!   OpenAIProvider /          QdrantIndex
//!   FastEmbedProvider
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_semantic::{
//!     EmbeddingConfig, MessageRouter, QdrantConfig, QdrantIndex, RouterContext,
//!     VectorIndexGateway,
//! };
//! use core_config::FromEnv;
//!
//! let embeddings = EmbeddingConfig::from_env()?.build_gateway()?;
//! let index = VectorIndexGateway::new(Arc::new(QdrantIndex::new(QdrantConfig::from_env()?)?));
//! let ctx = RouterContext::new(embeddings, index, Arc::new(producer));
//!
//! MessageRouter::new(Arc::new(consumer), ctx, "text-topic")
//!     .run(shutdown_rx)
//!     .await?;
//! ```

pub mod correlator;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod router;
pub mod streams;

pub use embedding::{EmbeddingConfig, EmbeddingGateway, EmbeddingProvider, OpenAIProvider};
#[cfg(feature = "fastembed")]
pub use embedding::FastEmbedProvider;
pub use error::{ErrorKind, SemanticError, SemanticResult};
pub use index::{QdrantConfig, QdrantIndex, VectorIndex, VectorIndexGateway};
pub use models::{
    Embedding, InboundMessage, IndexPoint, InsertRequest, PointPayload, Rejection,
    ResultEnvelope, SearchHit, SearchRequest, SearchResponse,
};
pub use router::{DEFAULT_SEARCH_LIMIT, MessageRouter, Outcome, RouterContext};
pub use streams::{ResponseTopic, TextTopic};
