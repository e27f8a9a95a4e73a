//! Process-wide ownership of the embedding and generation models.
//!
//! [`ModelRegistry`] exclusively owns one [`ModelHandle`] per model. A
//! handle wraps a [`ModelLoader`] in a [`SingleFlight`] cell, so:
//!
//! - the first request triggers the load and suspends until it finishes,
//! - concurrent requests await that same load instead of starting another,
//! - a failed load is retried on the next request, once.
//!
//! The registry is an ordinary value shared through `Arc`; tests build one
//! from in-memory models with [`ModelHandle::preloaded`] or a closure loader.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use docchat_core::embedding::Embedder;
use docchat_core::generation::Generator;
use docchat_core::RagError;

use crate::config::Config;
use crate::embedding::load_embedder;
use crate::flight::{InitState, SingleFlight};
use crate::generation::load_generator;

/// Status line shown while any model is loading.
pub const LOADING_MESSAGE: &str = "Loading AI models...";
/// Status line shown once both models are ready.
pub const READY_MESSAGE: &str = "AI models loaded (using RAG)";

/// Produces a model instance. Called once per load attempt.
#[async_trait]
pub trait ModelLoader<M: ?Sized>: Send + Sync {
    async fn load(&self) -> Result<Arc<M>, RagError>;
}

#[async_trait]
impl<M, F, Fut> ModelLoader<M> for F
where
    M: ?Sized + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Arc<M>, RagError>> + Send + 'static,
{
    async fn load(&self) -> Result<Arc<M>, RagError> {
        (self)().await
    }
}

/// Lazily loaded, shared model instance.
pub struct ModelHandle<M: ?Sized> {
    name: &'static str,
    loader: Box<dyn ModelLoader<M>>,
    cell: SingleFlight<Arc<M>, RagError>,
}

impl<M: ?Sized + Send + Sync + 'static> ModelHandle<M> {
    pub fn new(name: &'static str, loader: impl ModelLoader<M> + 'static) -> Self {
        Self {
            name,
            loader: Box::new(loader),
            cell: SingleFlight::new(),
        }
    }

    /// A handle that is already `Ready` with `model`.
    pub fn preloaded(name: &'static str, model: Arc<M>) -> Self {
        let shared = Arc::clone(&model);
        let loader = move || {
            let model = Arc::clone(&shared);
            async move { Ok::<_, RagError>(model) }
        };
        Self {
            name,
            loader: Box::new(loader),
            cell: SingleFlight::ready(model),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> InitState {
        self.cell.state()
    }

    pub fn is_initializing(&self) -> bool {
        self.state() == InitState::Initializing
    }

    pub fn is_ready(&self) -> bool {
        self.state() == InitState::Ready
    }

    /// Return the model, loading it first if needed.
    pub async fn get(&self) -> Result<Arc<M>, RagError> {
        let name = self.name;
        let loader = &self.loader;
        self.cell
            .get_or_try_init(|| async move {
                tracing::info!(model = name, "loading model");
                let result = loader.load().await;
                match &result {
                    Ok(_) => tracing::info!(model = name, "model ready"),
                    Err(e) => tracing::warn!(model = name, error = %e, "model load failed"),
                }
                result
            })
            .await
    }
}

/// Owner of the two process-wide model handles.
pub struct ModelRegistry {
    embedding: ModelHandle<dyn Embedder>,
    generation: ModelHandle<dyn Generator>,
}

impl ModelRegistry {
    pub fn new(embedding: ModelHandle<dyn Embedder>, generation: ModelHandle<dyn Generator>) -> Self {
        Self {
            embedding,
            generation,
        }
    }

    /// Handles that load the providers named in `config` on first use.
    pub fn from_config(config: &Config) -> Self {
        let embedding_config = config.embedding.clone();
        let generation_config = config.generation.clone();

        let embedding: ModelHandle<dyn Embedder> = ModelHandle::new("embedding", move || {
            let config = embedding_config.clone();
            async move { load_embedder(&config).await }
        });
        let generation: ModelHandle<dyn Generator> = ModelHandle::new("generation", move || {
            let config = generation_config.clone();
            async move { load_generator(&config).await }
        });

        Self::new(embedding, generation)
    }

    pub async fn embedder(&self) -> Result<Arc<dyn Embedder>, RagError> {
        self.embedding.get().await
    }

    pub async fn generator(&self) -> Result<Arc<dyn Generator>, RagError> {
        self.generation.get().await
    }

    pub fn embedding_state(&self) -> InitState {
        self.embedding.state()
    }

    pub fn generation_state(&self) -> InitState {
        self.generation.state()
    }

    pub fn is_embedding_model_loading(&self) -> bool {
        self.embedding.is_initializing()
    }

    pub fn is_generation_model_loading(&self) -> bool {
        self.generation.is_initializing()
    }

    /// True once both models have loaded successfully.
    pub fn is_model_path_ready(&self) -> bool {
        self.embedding.is_ready() && self.generation.is_ready()
    }

    /// Loading banner for status displays, if one applies.
    pub fn status_message(&self) -> Option<&'static str> {
        if self.is_embedding_model_loading() || self.is_generation_model_loading() {
            Some(LOADING_MESSAGE)
        } else if self.is_model_path_ready() {
            Some(READY_MESSAGE)
        } else {
            None
        }
    }

    /// Load both models concurrently and report each outcome.
    pub async fn warm_up(&self) -> (Result<(), RagError>, Result<(), RagError>) {
        let (embedding, generation) = tokio::join!(self.embedder(), self.generator());
        (embedding.map(|_| ()), generation.map(|_| ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed;

    #[async_trait]
    impl Embedder for Fixed {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct Parrot;

    #[async_trait]
    impl Generator for Parrot {
        fn model_name(&self) -> &str {
            "parrot"
        }
        async fn complete(&self, prompt: &str) -> Result<String, RagError> {
            Ok(format!("{} ok", prompt))
        }
    }

    #[tokio::test]
    async fn test_disabled_config_is_never_ready() {
        let registry = ModelRegistry::from_config(&Config::default());
        assert_eq!(registry.embedding_state(), InitState::Uninitialized);
        assert!(registry.embedder().await.is_err());
        assert!(registry.generator().await.is_err());
        assert_eq!(registry.embedding_state(), InitState::Failed);
        assert!(!registry.is_model_path_ready());
        assert_eq!(registry.status_message(), None);
    }

    #[tokio::test]
    async fn test_preloaded_models_ready() {
        let registry = ModelRegistry::new(
            ModelHandle::preloaded("embedding", Arc::new(Fixed) as Arc<dyn Embedder>),
            ModelHandle::preloaded("generation", Arc::new(Parrot) as Arc<dyn Generator>),
        );
        assert!(registry.is_model_path_ready());
        assert_eq!(registry.status_message(), Some(READY_MESSAGE));
        let (e, g) = registry.warm_up().await;
        assert!(e.is_ok() && g.is_ok());
    }

    #[tokio::test]
    async fn test_closure_loader_runs_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let handle: ModelHandle<dyn Embedder> = ModelHandle::new("embedding", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Fixed) as Arc<dyn Embedder>)
            }
        });

        assert!(!handle.is_ready());
        handle.get().await.unwrap();
        handle.get().await.unwrap();
        assert!(handle.is_ready());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_retries_on_next_request() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let handle: ModelHandle<dyn Generator> = ModelHandle::new("generation", move || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(RagError::generation("weights missing"))
                } else {
                    Ok(Arc::new(Parrot) as Arc<dyn Generator>)
                }
            }
        });

        assert!(handle.get().await.is_err());
        assert_eq!(handle.state(), InitState::Failed);
        assert!(handle.get().await.is_ok());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
