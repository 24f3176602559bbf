use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::error::{SemanticError, SemanticResult};
use crate::models::Embedding;

/// OpenAI-compatible embeddings endpoint configuration
///
/// Works against OpenAI itself or any server exposing `POST {base_url}/embeddings`
/// (text-embeddings-inference, Ollama, vLLM).
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: base_url.into(),
            model: model.into(),
            timeout_secs: 30,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

/// Embeddings over HTTP
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> SemanticResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SemanticError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn embed(&self, text: &str) -> SemanticResult<Embedding> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: [text],
        };

        let mut builder = self.client.post(self.config.endpoint()).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SemanticError::Embedding(format!(
                "Embeddings API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response.json().await?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| SemanticError::Embedding("No embedding returned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = OpenAIConfig::new("http://localhost:8081/v1/", "all-MiniLM-L6-v2");
        assert_eq!(config.endpoint(), "http://localhost:8081/v1/embeddings");
    }

    #[test]
    fn test_request_shape() {
        let request = EmbeddingRequest {
            model: "all-MiniLM-L6-v2",
            input: ["hello world"],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"model": "all-MiniLM-L6-v2", "input": ["hello world"]})
        );
    }

    #[test]
    fn test_response_ignores_extra_fields() {
        let body: EmbeddingResponse = serde_json::from_str(
            r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.1,0.2]}],"usage":{"prompt_tokens":2,"total_tokens":2}}"#,
        )
        .unwrap();
        assert_eq!(body.data[0].embedding, vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_embedding_error() {
        let provider = OpenAIProvider::new(
            OpenAIConfig::new("http://127.0.0.1:9", "all-MiniLM-L6-v2").with_timeout(2),
        )
        .unwrap();

        let err = provider.embed("hello").await.unwrap_err();
        assert!(matches!(err, SemanticError::Embedding(_)));
    }
}
