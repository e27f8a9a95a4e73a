//! Embedding model trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus pure helpers for validating model output and computing similarity.
//!
//! Concrete providers (OpenAI, Ollama, fastembed) live in the `docchat`
//! app crate. Whatever numeric type a backend produces, it is converted to
//! dense `Vec<f32>` vectors once, at the provider boundary, and checked with
//! [`validate_embeddings`].

use async_trait::async_trait;

use crate::error::RagError;

/// Trait for embedding models.
///
/// Maps text to fixed-length vectors. `dims` is fixed when the model is
/// loaded; `0` means the dimensionality is only known from the first output.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding("empty embedding response"))
    }
}

/// Check a batch of model output before it enters the pipeline.
///
/// Rejects a vector count that differs from `expected`, empty vectors,
/// non-finite components, vectors whose length differs from `dims`
/// (when `dims > 0`), and batches whose vectors disagree on length.
pub fn validate_embeddings(
    vectors: &[Vec<f32>],
    expected: usize,
    dims: usize,
) -> Result<(), RagError> {
    if vectors.len() != expected {
        return Err(RagError::EmbeddingFailure(format!(
            "expected {} vectors, model returned {}",
            expected,
            vectors.len()
        )));
    }

    let width = if dims > 0 {
        dims
    } else {
        vectors.first().map(Vec::len).unwrap_or(0)
    };

    for (i, v) in vectors.iter().enumerate() {
        if v.is_empty() {
            return Err(RagError::EmbeddingFailure(format!("vector {} is empty", i)));
        }
        if v.len() != width {
            return Err(RagError::EmbeddingFailure(format!(
                "vector {} has {} dimensions, expected {}",
                i,
                v.len(),
                width
            )));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(RagError::EmbeddingFailure(format!(
                "vector {} contains non-finite values",
                i
            )));
        }
    }

    Ok(())
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, and when
/// either vector has zero magnitude.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}
