//! Error taxonomy for the retrieval pipeline.
//!
//! Only [`RagError::EmptyDocument`] is meant to reach callers of the
//! orchestrator. The other variants are recovered inside the pipeline:
//! embedding and generation failures route to the fallback responder, and
//! [`RagError::IndexNotReady`] turns into the "couldn't find relevant
//! information" reply.

use thiserror::Error;

/// Errors raised by chunking, embedding, indexing, and generation.
///
/// `Clone` so a single failed load or build can be reported to every task
/// that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RagError {
    /// The document text was empty or whitespace-only.
    #[error("document text is empty")]
    EmptyDocument,
    /// The embedding model failed to load or produced unusable output.
    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),
    /// A query was issued against an index with no embedded chunks.
    #[error("vector index is not ready")]
    IndexNotReady,
    /// The generation model failed to load, errored, or returned blank text.
    #[error("generation failed: {0}")]
    GenerationFailure(String),
}

impl RagError {
    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        RagError::EmbeddingFailure(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        RagError::GenerationFailure(err.to_string())
    }

    /// True for the misuse errors that callers must handle themselves.
    pub fn is_misuse(&self) -> bool {
        matches!(self, RagError::EmptyDocument)
    }
}
