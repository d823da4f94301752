//! services/api/src/adapters/embeddings.rs
//!
//! Minimal client for an OpenAI-compatible embeddings endpoint, implementing
//! the `EmbeddingService` port. Embeddings are often served from a different
//! host than the chat models (e.g. a local sentence-transformer server), so
//! this adapter carries its own base URL rather than sharing the chat
//! client's. We only need one request shape, so a thin reqwest wrapper keeps
//! the surface small. The API key is never logged.

use std::time::Duration;

use async_trait::async_trait;
use practice_lab_core::ports::{EmbeddingService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

/// An adapter that implements the `EmbeddingService` port against an
/// OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct OpenAiEmbeddingAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiEmbeddingAdapter {
    /// Creates a new `OpenAiEmbeddingAdapter`. `base_url` falls back to the
    /// public OpenAI endpoint when not configured.
    pub fn new(api_key: String, base_url: Option<String>, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model,
        }
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbeddingAdapter {
    async fn embed(&self, text: &str) -> PortResult<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "embedding endpoint returned {}",
                status
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("embedding response invalid: {}", e)))?;

        let row = body.data.into_iter().next().ok_or_else(|| {
            PortError::Unexpected("embedding response contained no vectors".to_string())
        })?;
        debug!(model = %self.model, dims = row.embedding.len(), "embedded text");
        Ok(row.embedding)
    }
}
