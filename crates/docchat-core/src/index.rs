//! In-memory vector index for one embedding context.
//!
//! Holds the chunks of a single document (or one concatenation of project
//! documents) together with their embeddings. Search is a brute-force
//! cosine scan: document-scale chunk counts are small, and exact ranking
//! matters more than sub-linear lookup.
//!
//! Contents live behind an `Arc` snapshot. [`VectorIndex::build`] validates
//! and assembles the new snapshot off to the side and swaps it in under a
//! short write lock, so a concurrent [`VectorIndex::query`] sees either the
//! old contents or the new ones, never a mix.

use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};

use crate::embedding::cosine_similarity;
use crate::error::RagError;
use crate::models::{Chunk, ScoredChunk};

#[derive(Debug)]
struct Entry {
    index: usize,
    text: String,
    vector: Vec<f32>,
}

#[derive(Debug, Default)]
struct Snapshot {
    dims: usize,
    entries: Vec<Entry>,
}

/// Similarity index over the embedded chunks of one context.
#[derive(Debug, Default)]
pub struct VectorIndex {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the index contents with `chunks`.
    ///
    /// Every chunk must carry an embedding, and all embeddings must share
    /// one non-zero dimensionality. An empty `chunks` slice is accepted and
    /// leaves the index in the not-ready state.
    ///
    /// # Errors
    ///
    /// [`RagError::EmbeddingFailure`] if a chunk has no embedding or the
    /// dimensionalities disagree. The previous contents stay in place.
    pub fn build(&self, chunks: &[Chunk]) -> Result<(), RagError> {
        let mut dims = 0;
        let mut entries = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let vector = chunk.embedding.as_ref().ok_or_else(|| {
                RagError::EmbeddingFailure(format!("chunk {} has no embedding", chunk.index))
            })?;
            if vector.is_empty() {
                return Err(RagError::EmbeddingFailure(format!(
                    "chunk {} has an empty embedding",
                    chunk.index
                )));
            }
            if dims == 0 {
                dims = vector.len();
            } else if vector.len() != dims {
                return Err(RagError::EmbeddingFailure(format!(
                    "chunk {} has {} dimensions, expected {}",
                    chunk.index,
                    vector.len(),
                    dims
                )));
            }
            entries.push(Entry {
                index: chunk.index,
                text: chunk.text.clone(),
                vector: vector.clone(),
            });
        }

        let next = Arc::new(Snapshot { dims, entries });
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = next;
        Ok(())
    }

    /// Return the `k` chunks most similar to `query_vec`, best first.
    ///
    /// Scores are cosine similarities. Ties keep the original chunk order.
    /// If `k` exceeds the number of chunks, all chunks are returned.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotReady`] when no embedded chunks are present.
    /// - [`RagError::EmbeddingFailure`] when `query_vec` does not match the
    ///   index dimensionality.
    pub fn query(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        let snapshot = self.current();
        if snapshot.entries.is_empty() {
            return Err(RagError::IndexNotReady);
        }
        if query_vec.len() != snapshot.dims {
            return Err(RagError::EmbeddingFailure(format!(
                "query has {} dimensions, index has {}",
                query_vec.len(),
                snapshot.dims
            )));
        }

        let mut scored: Vec<(usize, f32)> = snapshot
            .entries
            .iter()
            .enumerate()
            .map(|(pos, e)| (pos, cosine_similarity(query_vec, &e.vector)))
            .collect();
        // sort_by is stable, so equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, score)| {
                let e = &snapshot.entries[pos];
                ScoredChunk {
                    index: e.index,
                    text: e.text.clone(),
                    score,
                }
            })
            .collect())
    }

    /// Drop all contents.
    pub fn clear(&self) {
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(Snapshot::default());
    }

    /// Number of embedded chunks.
    pub fn len(&self) -> usize {
        self.current().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the index can answer queries.
    pub fn is_ready(&self) -> bool {
        !self.is_empty()
    }

    /// Embedding dimensionality, or `0` when empty.
    pub fn dims(&self) -> usize {
        self.current().dims
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Content identity of a context text (hex SHA-256).
///
/// Two contexts share an index exactly when their keys are equal.
pub fn content_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
