//! Word-boundary text chunker.
//!
//! Splits document text into [`Chunk`]s of at most `words_per_chunk`
//! whitespace-delimited words. Chunks are the unit of embedding and
//! retrieval, so the split must be deterministic: the same text always
//! yields the same chunks in the same order.
//!
//! # Algorithm
//!
//! 1. Reject empty or whitespace-only text with [`RagError::EmptyDocument`].
//! 2. Split on Unicode whitespace, discarding empty tokens.
//! 3. Group consecutive words into runs of `words_per_chunk`; the last run
//!    may be shorter.
//! 4. Join each run with single spaces.
//!
//! Joining the chunks with spaces reproduces the original word sequence
//! with whitespace collapsed.
//!
//! # Example
//!
//! ```rust
//! use docchat_core::chunk::chunk_words;
//!
//! let chunks = chunk_words("one two three four five", 2).unwrap();
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(chunks[2].text, "five");
//! ```

use crate::error::RagError;
use crate::models::Chunk;

/// Default chunk size in words.
pub const DEFAULT_WORDS_PER_CHUNK: usize = 300;

/// Split text into chunks of at most `words_per_chunk` words.
///
/// A `words_per_chunk` of zero is treated as one word per chunk.
///
/// # Errors
///
/// Returns [`RagError::EmptyDocument`] when `text` contains no words.
pub fn chunk_words(text: &str, words_per_chunk: usize) -> Result<Vec<Chunk>, RagError> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Err(RagError::EmptyDocument);
    }

    let size = words_per_chunk.max(1);
    Ok(words
        .chunks(size)
        .enumerate()
        .map(|(index, run)| Chunk::new(index, run.join(" ")))
        .collect())
}
