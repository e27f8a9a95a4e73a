//! Embedding model implementations.
//!
//! Concrete [`Embedder`]s for the providers selectable in `[embedding]`:
//! - **[`OpenAiEmbedder`]**: calls the OpenAI embeddings API with batching, retry, and backoff.
//! - **[`OllamaEmbedder`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **`LocalEmbedder`**: runs a fastembed model in-process; no network calls after model download.
//!
//! `"disabled"` has no model: [`load_embedder`] fails, which leaves the
//! embedding handle in its failed state and routes every query to the
//! fallback responder.
//!
//! Each provider converts its wire format to `Vec<Vec<f32>>` exactly once
//! and checks it with [`validate_embeddings`] before returning.

#[cfg(feature = "local-embeddings")]
mod local;

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

use async_trait::async_trait;
use std::sync::Arc;

use docchat_core::embedding::{validate_embeddings, Embedder};
use docchat_core::RagError;

use crate::config::EmbeddingConfig;
use crate::http;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Build the embedding model selected by `config`.
///
/// This is the loader behind the embedding [`ModelHandle`](crate::registry::ModelHandle):
/// it runs at most once per load attempt, and for the local provider it
/// performs the (slow) model download and initialization.
///
/// # Supported Providers
///
/// | Config Value | Model |
/// |-------------|-------|
/// | `"disabled"` | none, always fails |
/// | `"openai"` | [`OpenAiEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"local"` | `LocalEmbedder` (requires the `local-embeddings` feature) |
pub async fn load_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, RagError> {
    match config.provider.as_str() {
        "disabled" => Err(RagError::embedding("embedding provider is disabled")),
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(LocalEmbedder::load(config).await?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => Err(RagError::embedding(
            "local embedding provider requires --features local-embeddings",
        )),
        other => Err(RagError::EmbeddingFailure(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ OpenAI Provider ============

/// Embedding model served by the OpenAI API.
///
/// Calls `POST /v1/embeddings`. Requires the `OPENAI_API_KEY` environment
/// variable at load time.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RagError> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| RagError::embedding("embedding.model required for OpenAI provider"))?;
        let api_key = http::openai_api_key().map_err(RagError::embedding)?;
        let client = http::client(config.timeout_secs).map_err(RagError::embedding)?;

        Ok(Self {
            client,
            api_key,
            model,
            dims: config.dims.unwrap_or(0),
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = http::post_json(
                &self.client,
                OPENAI_EMBEDDINGS_URL,
                Some(&self.api_key),
                &body,
                self.max_retries,
                "OpenAI",
            )
            .await
            .map_err(RagError::embedding)?;
            let vectors = parse_openai_response(&json)?;
            validate_embeddings(&vectors, batch.len(), self.dims)?;
            all.extend(vectors);
        }
        validate_embeddings(&all, texts.len(), self.dims)?;
        Ok(all)
    }
}

/// Parse the OpenAI embeddings API response JSON.
///
/// Extracts the `data[].embedding` arrays, ordered by `data[].index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, RagError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| RagError::embedding("invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| RagError::embedding("invalid OpenAI response: missing embedding"))?;
        indexed.push((index, json_to_vector(embedding)?));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding model served by a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default: `http://localhost:11434`).
/// Requires Ollama to be running with an embedding model pulled (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    model: String,
    dims: usize,
    url: String,
    batch_size: usize,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RagError> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| RagError::embedding("embedding.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        let client = http::client(config.timeout_secs).map_err(RagError::embedding)?;

        Ok(Self {
            client,
            model,
            dims: config.dims.unwrap_or(0),
            url,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let endpoint = format!("{}/api/embed", self.url.trim_end_matches('/'));
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = http::post_json(
                &self.client,
                &endpoint,
                None,
                &body,
                self.max_retries,
                "Ollama",
            )
            .await
            .map_err(RagError::embedding)?;
            let vectors = parse_ollama_response(&json)?;
            validate_embeddings(&vectors, batch.len(), self.dims)?;
            all.extend(vectors);
        }
        validate_embeddings(&all, texts.len(), self.dims)?;
        Ok(all)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, RagError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| RagError::embedding("invalid Ollama response: missing embeddings array"))?;

    embeddings.iter().map(json_to_vector).collect()
}

/// Convert a JSON array of numbers to a vector, rejecting anything else.
fn json_to_vector(value: &serde_json::Value) -> Result<Vec<f32>, RagError> {
    value
        .as_array()
        .ok_or_else(|| RagError::embedding("embedding is not an array"))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| RagError::embedding("embedding contains a non-numeric value"))
        })
        .collect()
}
