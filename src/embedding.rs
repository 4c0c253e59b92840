//! OpenAI-compatible embedding client.
//!
//! Calls `POST {base_url}/embeddings` with the configured model and
//! requested dimensionality. One attempt per call: there is no retry or
//! backoff, and a request that exceeds the configured timeout fails with
//! [`UpstreamError::Timeout`].
//!
//! # Response handling
//!
//! - `data[]` is reordered by its `index` field so vectors line up with inputs.
//! - A vector count different from the input count is an error.
//! - An empty input batch returns an empty result without a request.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use pmmsherpa_core::embedding::Embedder;
use pmmsherpa_core::error::UpstreamError;

use crate::config::EmbeddingConfig;

const SERVICE: &str = "embeddings";

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl OpenAIEmbedder {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dims: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            bail!("embedding API key must not be empty");
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
            dims,
        })
    }

    /// Build from config, reading the API key from `embedding.api_key_env`.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!("{} environment variable not set", config.api_key_env)
        })?;

        Self::new(
            &config.base_url,
            api_key,
            config.model.clone(),
            config.dims,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
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

fn map_send_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::timeout(SERVICE)
    } else {
        UpstreamError::embedding(format!("request failed: {e}"))
    }
}

/// Order vectors by `index` and check there is one per input.
fn into_ordered_vectors(
    mut data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, UpstreamError> {
    if data.len() != expected {
        return Err(UpstreamError::invalid_response(
            SERVICE,
            format!("expected {} embeddings, got {}", expected, data.len()),
        ));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, UpstreamError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(batch_size = texts.len(), model = %self.model, dims = self.dims, "embedding batch");

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dims,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(UpstreamError::embedding(format!("API error {}: {}", status, message)));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::timeout(SERVICE)
            } else {
                UpstreamError::invalid_response(SERVICE, e.to_string())
            }
        })?;

        into_ordered_vectors(parsed.data, texts.len())
    }
}
