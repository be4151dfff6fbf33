//! Embedding provider for OpenAI-compatible `/v1/embeddings` endpoints.
//!
//! Works against the OpenAI API and against local servers that expose the
//! same route (Ollama, vLLM, llama.cpp server). This module is only available
//! when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::{EmbeddingProvider, ProviderIdentity};
use crate::error::{RagError, Result};

/// The default OpenAI API base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Ollama's OpenAI-compatible base URL.
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SERVICE: &str = "openai-compatible";

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// The caller states the model's output dimensionality up front; responses
/// of another length are rejected so an index never mixes sizes.
///
/// # Example
///
/// ```rust,ignore
/// use sucupira_rag::openai::OpenAiCompatibleEmbeddingProvider;
///
/// // paraphrase-multilingual served by a local Ollama
/// let provider = OpenAiCompatibleEmbeddingProvider::ollama("paraphrase-multilingual", 768)?;
/// let embedding = provider.embed("Revista de Saúde Pública").await?;
/// ```
pub struct OpenAiCompatibleEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAiCompatibleEmbeddingProvider {
    /// Create a provider for `model` at `base_url` (e.g. `http://host:11434/v1`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::ConfigError("dimensions must be greater than zero".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RagError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
            dimensions,
            request_dimensions: None,
        })
    }

    /// Create a provider for the hosted OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("API key must not be empty".into()));
        }
        Ok(Self::new(OPENAI_BASE_URL, model, dimensions)?.with_api_key(api_key))
    }

    /// Create a provider using the `OPENAI_API_KEY` environment variable.
    pub fn openai_from_env(model: impl Into<String>, dimensions: usize) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::ConfigError("OPENAI_API_KEY environment variable not set".into())
        })?;
        Self::openai(api_key, model, dimensions)
    }

    /// Create a provider for a local Ollama server.
    pub fn ollama(model: impl Into<String>, dimensions: usize) -> Result<Self> {
        Self::new(OLLAMA_BASE_URL, model, dimensions)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Ask the API to truncate embeddings to the configured dimensionality.
    pub fn with_requested_dimensions(mut self) -> Self {
        self.request_dimensions = Some(self.dimensions);
        self
    }
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Order response rows by their `index` field when present.
fn into_ordered_embeddings(mut data: Vec<EmbeddingData>) -> Vec<Vec<f32>> {
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    data.into_iter().map(|d| d.embedding).collect()
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = SERVICE, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::external(SERVICE, "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = SERVICE, batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let mut request = self.client.post(format!("{}/embeddings", self.base_url)).json(&request_body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = SERVICE, error = %e, "request failed");
            RagError::external(SERVICE, format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = SERVICE, %status, "API error");
            return Err(RagError::external(SERVICE, format!("API returned {status}: {detail}")));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = SERVICE, error = %e, "failed to parse response");
            RagError::external(SERVICE, format!("failed to parse response: {e}"))
        })?;

        let embeddings = into_ordered_embeddings(embedding_response.data);
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(RagError::DimensionMismatch { expected: self.dimensions, actual: bad.len() });
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity::new(SERVICE, &self.model, self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_rows_are_reordered_by_index() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .unwrap();
        assert_eq!(into_ordered_embeddings(response.data), vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn identity_names_the_model() {
        let provider = OpenAiCompatibleEmbeddingProvider::ollama("nomic-embed-text", 768).unwrap();
        assert_eq!(provider.identity(), ProviderIdentity::new(SERVICE, "nomic-embed-text", 768));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(OpenAiCompatibleEmbeddingProvider::ollama("m", 0).is_err());
    }
}
