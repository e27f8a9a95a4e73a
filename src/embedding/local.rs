//! In-process embedding with fastembed.
//!
//! The model is downloaded from Hugging Face on first load and cached;
//! after that no network calls are made. Loading and inference are
//! CPU-bound, so both run on tokio's blocking pool.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use docchat_core::embedding::{validate_embeddings, Embedder};
use docchat_core::RagError;

use crate::config::EmbeddingConfig;

const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

/// Embedding model running locally via fastembed.
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<Mutex<fastembed::TextEmbedding>>,
}

impl LocalEmbedder {
    /// Download (if needed) and initialize the configured model.
    pub async fn load(config: &EmbeddingConfig) -> Result<Self, RagError> {
        let (model_name, dims) = resolve_local_model(config);
        let fastembed_model = config_to_fastembed_model(&model_name)?;

        tracing::info!(model = %model_name, "loading local embedding model");
        let model = tokio::task::spawn_blocking(move || {
            fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
            )
        })
        .await
        .map_err(RagError::embedding)?
        .map_err(|e| {
            RagError::EmbeddingFailure(format!(
                "failed to initialize local embedding model: {}",
                e
            ))
        })?;

        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size.max(1),
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let model = Arc::clone(&self.model);
        let batch_size = self.batch_size;
        let owned = texts.to_vec();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| RagError::embedding("local embedding model lock poisoned"))?;
            guard
                .embed(owned, Some(batch_size))
                .map_err(|e| RagError::EmbeddingFailure(format!("local embedding failed: {}", e)))
        })
        .await
        .map_err(RagError::embedding)??;

        validate_embeddings(&vectors, texts.len(), self.dims)?;
        Ok(vectors)
    }
}

fn resolve_local_model(config: &EmbeddingConfig) -> (String, usize) {
    let model_name = config
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());

    let dims = config.dims.unwrap_or(match model_name.as_str() {
        "all-minilm-l6-v2" => 384,
        "bge-small-en-v1.5" => 384,
        "bge-base-en-v1.5" => 768,
        "bge-large-en-v1.5" => 1024,
        "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => 768,
        "multilingual-e5-small" => 384,
        "multilingual-e5-base" => 768,
        "multilingual-e5-large" => 1024,
        _ => 0,
    });

    (model_name, dims)
}

fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel, RagError> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => Err(RagError::EmbeddingFailure(format!(
            "unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
            other
        ))),
    }
}
