//! Retrieval-augmented answering.
//!
//! [`RagOrchestrator::answer_query`] is the one operation the rest of the
//! application needs: plain context text and a question in, an [`Answer`]
//! out. Each call walks these stages:
//!
//! ```text
//! Idle ──▶ BuildingIndex ──▶ Retrieving ──▶ Generating ──▶ Done
//!  │        (context changed)     │               │
//!  │              │               │               │
//!  │              └───────────────┴───────────────┴──▶ Fallback
//!  └─ empty text ──▶ EmptyDocument error
//! ```
//!
//! - **BuildingIndex** chunks the text, embeds every chunk, and builds a
//!   [`VectorIndex`]. Indexes are cached by content hash, so a context is
//!   embedded once and reused until its text changes. Concurrent calls for
//!   the same text share one build.
//! - **Retrieving** embeds the query and takes the top `k` chunks. An empty
//!   result yields the fixed "couldn't find relevant information" reply.
//! - **Generating** joins the chunks with blank lines and asks the
//!   generation model. An optional timeout applies to this stage only.
//! - **Fallback** answers from [`fallback::respond`] whenever a stage fails.
//!
//! Only [`RagError::EmptyDocument`] escapes to the caller.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use docchat_core::chunk::{chunk_words, DEFAULT_WORDS_PER_CHUNK};
use docchat_core::embedding::validate_embeddings;
use docchat_core::fallback;
use docchat_core::index::{content_key, VectorIndex};
use docchat_core::models::{Answer, Chunk};
use docchat_core::RagError;

use crate::config::Config;
use crate::flight::{InitState, SingleFlight};
use crate::registry::ModelRegistry;

/// Pipeline tuning, decoupled from the config file layout.
#[derive(Debug, Clone)]
pub struct RagParams {
    pub words_per_chunk: usize,
    pub top_k: usize,
    /// Number of built indexes kept; the oldest is evicted first.
    pub max_cached_contexts: usize,
    pub answer_timeout: Option<Duration>,
}

impl Default for RagParams {
    fn default() -> Self {
        Self {
            words_per_chunk: DEFAULT_WORDS_PER_CHUNK,
            top_k: 3,
            max_cached_contexts: 8,
            answer_timeout: None,
        }
    }
}

impl From<&Config> for RagParams {
    fn from(config: &Config) -> Self {
        Self {
            words_per_chunk: config.chunking.words_per_chunk,
            top_k: config.retrieval.top_k,
            max_cached_contexts: config.retrieval.max_cached_contexts,
            answer_timeout: config.generation.answer_timeout(),
        }
    }
}

/// Pipeline stage, reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    BuildingIndex,
    Retrieving,
    Generating,
    Done,
    Fallback,
}

struct ContextSlot {
    key: String,
    index: SingleFlight<Arc<VectorIndex>, RagError>,
}

/// Coordinates chunking, embedding, retrieval, generation, and fallback.
pub struct RagOrchestrator {
    registry: Arc<ModelRegistry>,
    params: RagParams,
    contexts: Mutex<VecDeque<Arc<ContextSlot>>>,
}

impl RagOrchestrator {
    pub fn new(registry: Arc<ModelRegistry>, params: RagParams) -> Self {
        Self {
            registry,
            params,
            contexts: Mutex::new(VecDeque::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn params(&self) -> &RagParams {
        &self.params
    }

    /// Answer `query` from `context_text`.
    ///
    /// Always returns a non-empty answer unless the context is empty.
    ///
    /// # Errors
    ///
    /// [`RagError::EmptyDocument`] when `context_text` has no words. No
    /// model is touched in that case.
    pub async fn answer_query(&self, context_text: &str, query: &str) -> Result<Answer, RagError> {
        if context_text.trim().is_empty() {
            return Err(RagError::EmptyDocument);
        }

        match self.run_model_path(context_text, query).await {
            Ok(answer) => {
                tracing::debug!(stage = ?Stage::Done, kind = ?answer.kind, "query answered");
                Ok(answer)
            }
            Err(e) => {
                tracing::warn!(stage = ?Stage::Fallback, error = %e, "model path failed, using fallback answer");
                Ok(Answer::fallback(fallback::respond(context_text, query)))
            }
        }
    }

    async fn run_model_path(&self, context_text: &str, query: &str) -> Result<Answer, RagError> {
        tracing::debug!(stage = ?Stage::Idle, chars = context_text.len(), "query received");
        let index = self.index_for(context_text).await?;

        tracing::debug!(stage = ?Stage::Retrieving, k = self.params.top_k);
        let embedder = self.registry.embedder().await?;
        let query_vec = embedder.embed_one(query).await?;
        let hits = match index.query(&query_vec, self.params.top_k) {
            Ok(hits) => hits,
            Err(RagError::IndexNotReady) => return Ok(Answer::no_relevant_context()),
            Err(e) => return Err(e),
        };
        if hits.is_empty() {
            return Ok(Answer::no_relevant_context());
        }

        tracing::debug!(stage = ?Stage::Generating, chunks = hits.len());
        let context = hits
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let generator = self.registry.generator().await?;
        let generation = generator.generate(&context, query);
        let text = match self.params.answer_timeout {
            Some(limit) => tokio::time::timeout(limit, generation)
                .await
                .map_err(|_| {
                    RagError::GenerationFailure(format!("generation timed out after {:?}", limit))
                })??,
            None => generation.await?,
        };
        if text.trim().is_empty() {
            return Err(RagError::generation("model returned a blank answer"));
        }

        Ok(Answer::grounded(text))
    }

    /// Build and cache the index for `context_text` before any question.
    ///
    /// Model failures are logged and left for the next `answer_query` to
    /// retry.
    ///
    /// # Errors
    ///
    /// [`RagError::EmptyDocument`] when `context_text` has no words.
    pub async fn prepare(&self, context_text: &str) -> Result<(), RagError> {
        if context_text.trim().is_empty() {
            return Err(RagError::EmptyDocument);
        }
        if let Err(e) = self.index_for(context_text).await {
            tracing::debug!(error = %e, "context not indexed ahead of time");
        }
        Ok(())
    }

    /// Return the index for `text`, building it if this text is new.
    async fn index_for(&self, text: &str) -> Result<Arc<VectorIndex>, RagError> {
        let slot = self.slot_for(&content_key(text));
        let result = slot.index.get_or_try_init(|| self.build_index(text)).await;
        drop(slot);
        self.evict(&mut self.lock_contexts());
        result
    }

    async fn build_index(&self, text: &str) -> Result<Arc<VectorIndex>, RagError> {
        tracing::debug!(stage = ?Stage::BuildingIndex, "indexing new context");
        let chunks = chunk_words(text, self.params.words_per_chunk)?;
        let embedder = self.registry.embedder().await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        validate_embeddings(&vectors, texts.len(), embedder.dims())?;

        let embedded: Vec<Chunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| chunk.with_embedding(vector))
            .collect();

        let index = VectorIndex::new();
        index.build(&embedded)?;
        tracing::info!(
            chunks = index.len(),
            dims = index.dims(),
            model = embedder.model_name(),
            "context indexed"
        );
        Ok(Arc::new(index))
    }

    fn lock_contexts(&self) -> MutexGuard<'_, VecDeque<Arc<ContextSlot>>> {
        self.contexts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot_for(&self, key: &str) -> Arc<ContextSlot> {
        let mut contexts = self.lock_contexts();
        if let Some(slot) = contexts.iter().find(|s| s.key == key) {
            return Arc::clone(slot);
        }

        let slot = Arc::new(ContextSlot {
            key: key.to_string(),
            index: SingleFlight::new(),
        });
        contexts.push_back(Arc::clone(&slot));
        self.evict(&mut contexts);
        slot
    }

    /// Drop failed slots, then the oldest slots until the cache fits.
    ///
    /// A slot still referenced outside the cache has a build or a waiter in
    /// flight and is never dropped, so the cache may briefly exceed its bound.
    fn evict(&self, contexts: &mut VecDeque<Arc<ContextSlot>>) {
        let idle = |s: &Arc<ContextSlot>| Arc::strong_count(s) == 1;

        contexts.retain(|s| {
            let failed = idle(s) && s.index.state() == InitState::Failed;
            if failed {
                tracing::debug!(key = %s.key, "dropping failed index");
            }
            !failed
        });

        while contexts.len() > self.params.max_cached_contexts.max(1) {
            let Some(pos) = contexts.iter().position(|s| idle(s)) else {
                break;
            };
            if let Some(evicted) = contexts.remove(pos) {
                tracing::debug!(key = %evicted.key, "evicting cached index");
            }
        }
    }

    /// True if an index for exactly this text is built and cached.
    pub fn is_indexed(&self, text: &str) -> bool {
        let key = content_key(text);
        self.lock_contexts()
            .iter()
            .any(|s| s.key == key && s.index.get().is_some())
    }

    /// Number of contexts currently cached or being built.
    pub fn cached_contexts(&self) -> usize {
        self.lock_contexts().len()
    }

    pub fn is_embedding_model_loading(&self) -> bool {
        self.registry.is_embedding_model_loading()
    }

    pub fn is_generation_model_loading(&self) -> bool {
        self.registry.is_generation_model_loading()
    }

    pub fn is_model_path_ready(&self) -> bool {
        self.registry.is_model_path_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_params_from_config() {
        let config = parse_config(
            "[chunking]\nwords_per_chunk = 50\n\n[retrieval]\ntop_k = 4\nmax_cached_contexts = 2\n\n\
             [generation]\nanswer_timeout_secs = 15\n",
        )
        .unwrap();
        let params = RagParams::from(&config);
        assert_eq!(params.words_per_chunk, 50);
        assert_eq!(params.top_k, 4);
        assert_eq!(params.max_cached_contexts, 2);
        assert_eq!(params.answer_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_slots_shared_by_key_and_bounded() {
        let registry = Arc::new(ModelRegistry::from_config(&Config::default()));
        let rag = RagOrchestrator::new(
            registry,
            RagParams {
                max_cached_contexts: 2,
                ..RagParams::default()
            },
        );
        let keys = |rag: &RagOrchestrator| -> Vec<String> {
            rag.lock_contexts().iter().map(|s| s.key.clone()).collect()
        };

        let a = rag.slot_for("a");
        assert!(Arc::ptr_eq(&a, &rag.slot_for("a")));
        rag.slot_for("b");
        rag.slot_for("c");
        // "a" is still held, so the idle "b" goes first.
        assert_eq!(keys(&rag), vec!["a", "c"]);
        assert!(Arc::ptr_eq(&a, &rag.slot_for("a")));

        drop(a);
        rag.slot_for("d");
        assert_eq!(keys(&rag), vec!["c", "d"]);
    }
}
