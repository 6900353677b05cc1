//! OpenAI embedding provider implementation.
//!
//! This module provides an implementation of the `EmbeddingProvider` trait
//! using OpenAI's text embedding API. The `/embeddings` endpoint accepts
//! either a single string or an array, so batch requests map onto one call.

use super::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Default API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI embedding provider.
///
/// Holds the configuration needed to connect to OpenAI's API and generate
/// embeddings using their models.
#[derive(Debug, Clone)]
pub struct OpenAIEmbedding {
    /// HTTP client, reused across requests
    client: reqwest::Client,

    /// OpenAI API key for authentication
    api_key: String,

    /// API base URL (override for compatible endpoints)
    base_url: String,

    /// Model identifier (e.g., "text-embedding-3-small")
    model: String,

    /// Expected dimension of the embedding vectors
    embedding_dimension: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl OpenAIEmbedding {
    /// Create a new OpenAI embedding provider.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (defaults to "text-embedding-3-small" if None)
    pub fn new(api_key: String, model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| "text-embedding-3-small".to_string());
        let embedding_dimension = match model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            _ => 1536, // default fallback
        };

        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            embedding_dimension,
        }
    }

    /// Override the API base URL (for OpenAI-compatible endpoints).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// POST a request to the embeddings endpoint and parse the vectors.
    async fn request_embeddings(&self, input: serde_json::Value) -> EmbeddingResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "input": input,
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::ApiError(format!("send embeddings request: {}", e)))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|e| EmbeddingError::ApiError(format!("read embeddings response: {}", e)))?;

        if !status.is_success() {
            return Err(EmbeddingError::ApiError(format!(
                "embeddings API error: {} {}",
                status, payload
            )));
        }

        let parsed: EmbeddingsResponse = serde_json::from_str(&payload)
            .map_err(|e| EmbeddingError::ApiError(format!("parse embeddings response: {}", e)))?;

        Ok(parsed.data.into_iter().map(|row| row.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedding {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Text cannot be empty".to_string(),
            ));
        }

        let embeddings = self.request_embeddings(json!(text)).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::ApiError("embeddings response missing data".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        for text in texts {
            if text.trim().is_empty() {
                return Err(EmbeddingError::InvalidInput(
                    "All texts must be non-empty".to_string(),
                ));
            }
        }

        let embeddings = self.request_embeddings(json!(texts)).await?;
        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::ApiError(format!(
                "embeddings response has {} vectors for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.embedding_dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
