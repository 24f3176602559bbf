use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{SemanticError, SemanticResult};

/// Fixed-length embedding produced by the configured model
pub type Embedding = Vec<f32>;

/// `{"type": "insert", "content": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertRequest {
    pub content: String,
}

/// `{"type": "search", "content": ..., "request_id": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// An entry of the inbound stream, classified by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    Insert(InsertRequest),
    Search(SearchRequest),
    /// Unknown or missing `type`; never encoded
    #[serde(skip)]
    Ignored { kind: Option<String> },
}

/// A payload that could not be decoded into an [`InboundMessage`].
#[derive(Debug)]
pub enum Rejection {
    /// Nobody is waiting on it; log and move on
    Drop(SemanticError),
    /// A search whose `request_id` was readable; it still gets an error envelope
    Answer {
        request_id: Option<String>,
        error: SemanticError,
    },
}

impl Rejection {
    pub fn error(&self) -> &SemanticError {
        match self {
            Rejection::Drop(error) | Rejection::Answer { error, .. } => error,
        }
    }
}

impl InboundMessage {
    pub fn insert(content: impl Into<String>) -> Self {
        InboundMessage::Insert(InsertRequest {
            content: content.into(),
        })
    }

    pub fn search(content: impl Into<String>, request_id: Option<String>) -> Self {
        InboundMessage::Search(SearchRequest {
            content: content.into(),
            request_id,
        })
    }

    /// Decode a raw stream payload.
    ///
    /// A missing, non-string or unrecognised `type` yields `Ignored`. A known
    /// type with a missing or non-string `content`, or a non-string
    /// `request_id`, is a schema error.
    pub fn decode(raw: &str) -> Result<Self, Rejection> {
        let value: Value = serde_json::from_str(raw).map_err(|e| {
            Rejection::Drop(SemanticError::Schema(format!(
                "payload is not valid JSON: {}",
                e
            )))
        })?;

        let Value::Object(map) = value else {
            return Err(Rejection::Drop(SemanticError::Schema(format!(
                "payload must be a JSON object, got {}",
                json_type(&value)
            ))));
        };

        let kind = match map.get("type") {
            Some(Value::String(kind)) => kind.as_str(),
            Some(other) => {
                return Ok(InboundMessage::Ignored {
                    kind: Some(other.to_string()),
                });
            }
            None => return Ok(InboundMessage::Ignored { kind: None }),
        };

        match kind {
            "insert" => {
                let content = string_field(&map, "content").map_err(Rejection::Drop)?;
                Ok(InboundMessage::Insert(InsertRequest { content }))
            }
            "search" => {
                let request_id = match map.get("request_id") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(id)) => Some(id.clone()),
                    // Dropped without a reply: an id that cannot be echoed
                    // verbatim would never match the caller's waiter.
                    Some(other) => {
                        return Err(Rejection::Drop(SemanticError::Schema(format!(
                            "request_id must be a string, got {}",
                            json_type(other)
                        ))));
                    }
                };

                match string_field(&map, "content") {
                    Ok(content) => Ok(InboundMessage::Search(SearchRequest {
                        content,
                        request_id,
                    })),
                    Err(error) => Err(Rejection::Answer { request_id, error }),
                }
            }
            other => Ok(InboundMessage::Ignored {
                kind: Some(other.to_string()),
            }),
        }
    }

    /// Encode for publishing on the inbound stream
    pub fn encode(&self) -> SemanticResult<String> {
        if let InboundMessage::Ignored { .. } = self {
            return Err(SemanticError::Schema(
                "ignored messages cannot be encoded".to_string(),
            ));
        }
        Ok(serde_json::to_string(self)?)
    }

    /// Label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Insert(_) => "insert",
            InboundMessage::Search(_) => "search",
            InboundMessage::Ignored { .. } => "ignored",
        }
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> SemanticResult<String> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(SemanticError::Schema(format!(
            "{} must be a string, got {}",
            key,
            json_type(other)
        ))),
        None => Err(SemanticError::Schema(format!("missing field '{}'", key))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Payload stored alongside each point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub text: String,
}

/// A point written to the index; every insert creates a new one
#[derive(Debug, Clone, PartialEq)]
pub struct IndexPoint {
    pub id: Uuid,
    pub vector: Embedding,
    pub payload: PointPayload,
}

impl IndexPoint {
    pub fn new(vector: Embedding, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vector,
            payload: PointPayload { text: text.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
}

/// Result of a search: hits, or the error that prevented them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResultEnvelope {
    Success { results: Vec<SearchHit> },
    Error { message: String },
}

impl ResultEnvelope {
    pub fn success(results: Vec<SearchHit>) -> Self {
        ResultEnvelope::Success { results }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ResultEnvelope::Error {
            message: message.into(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            ResultEnvelope::Success { .. } => "success",
            ResultEnvelope::Error { .. } => "error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultEnvelope::Success { .. })
    }
}

/// Published on the response stream, one per search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub request_id: Option<String>,
    pub results: ResultEnvelope,
}
