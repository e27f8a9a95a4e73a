//! Conversations over a document or a whole project.
//!
//! [`ChatService::send`] records the user's message, resolves the context
//! text for the conversation, asks the [`RagOrchestrator`], and records the
//! assistant's reply. Messages for one conversation are handled strictly in
//! send order: a second `send` waits until the first reply is stored.
//! Different conversations proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use docchat_core::context::{build_project_context, ProjectDocument, DEFAULT_EXCERPT_CHARS};
use docchat_core::models::{AnswerKind, ChatMessage, Role};
use docchat_core::session::ChatStore;

use crate::config::Config;
use crate::rag::{RagOrchestrator, RagParams};
use crate::registry::ModelRegistry;

/// Reply when a document conversation has no extracted text.
pub const NO_DOCUMENT_MESSAGE: &str =
    "I cannot answer without any document content. Please upload documents first.";
/// Reply when no document in a project has content.
pub const NO_PROJECT_DOCUMENTS_MESSAGE: &str =
    "I cannot answer without any document content. Please upload and open documents in this project first.";
/// Reply when answering failed unexpectedly.
pub const PROCESSING_ERROR_MESSAGE: &str =
    "I apologize, but I encountered an error processing your request.";

/// Where a conversation draws its context from.
#[derive(Debug, Clone)]
pub enum ChatContext {
    /// A single document; `None` until its text has been extracted.
    Document(Option<String>),
    /// Every document of a project.
    Project(Vec<ProjectDocument>),
}

/// How an assistant reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Answer(AnswerKind),
    MissingDocuments,
    Error,
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub message: ChatMessage,
    pub source: ReplySource,
}

impl ChatReply {
    pub fn is_grounded(&self) -> bool {
        self.source == ReplySource::Answer(AnswerKind::Grounded)
    }
}

/// Chat front end over a shared [`RagOrchestrator`].
pub struct ChatService {
    rag: Arc<RagOrchestrator>,
    store: ChatStore,
    excerpt_chars: usize,
    lanes: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ChatService {
    pub fn new(rag: Arc<RagOrchestrator>) -> Self {
        Self {
            rag,
            store: ChatStore::new(),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Service with lazily loaded models as configured.
    pub fn from_config(config: &Config) -> Self {
        let registry = Arc::new(ModelRegistry::from_config(config));
        let rag = Arc::new(RagOrchestrator::new(registry, RagParams::from(config)));
        Self::new(rag).with_excerpt_chars(config.project.excerpt_chars)
    }

    /// Override how many characters each project document contributes.
    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    pub fn rag(&self) -> &Arc<RagOrchestrator> {
        &self.rag
    }

    /// Send `content` as the user and return the assistant's reply.
    ///
    /// Both messages are appended to the conversation before this returns.
    pub async fn send(&self, conversation_id: &str, content: &str, context: &ChatContext) -> ChatReply {
        let lane = self.lane(conversation_id);
        let _turn = lane.lock().await;

        self.store.append(conversation_id, Role::User, content);

        let (text, source) = match self.resolve(context) {
            Err(missing) => (missing.to_string(), ReplySource::MissingDocuments),
            Ok(context_text) => match self.rag.answer_query(&context_text, content).await {
                Ok(answer) => {
                    let kind = answer.kind;
                    (answer.text, ReplySource::Answer(kind))
                }
                Err(e) if e.is_misuse() => {
                    (self.missing_message(context).to_string(), ReplySource::MissingDocuments)
                }
                Err(e) => {
                    tracing::error!(conversation = conversation_id, error = %e, "chat turn failed");
                    (PROCESSING_ERROR_MESSAGE.to_string(), ReplySource::Error)
                }
            },
        };

        let message = self.store.append(conversation_id, Role::Assistant, text);
        ChatReply { message, source }
    }

    /// Index the conversation's context ahead of its first question.
    ///
    /// Does nothing when the context has no text. Model failures are left
    /// for `send` to fall back from.
    pub async fn prepare(&self, context: &ChatContext) {
        if let Ok(context_text) = self.resolve(context) {
            // Only an empty context is rejected, and `resolve` filters those.
            let _ = self.rag.prepare(&context_text).await;
        }
    }

    fn resolve(&self, context: &ChatContext) -> Result<String, &'static str> {
        let text = match context {
            ChatContext::Document(text) => text.clone().filter(|t| !t.trim().is_empty()),
            ChatContext::Project(docs) => build_project_context(docs, self.excerpt_chars),
        };
        text.ok_or_else(|| self.missing_message(context))
    }

    fn missing_message(&self, context: &ChatContext) -> &'static str {
        match context {
            ChatContext::Document(_) => NO_DOCUMENT_MESSAGE,
            ChatContext::Project(_) => NO_PROJECT_DOCUMENTS_MESSAGE,
        }
    }

    fn lane(&self, conversation_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(lanes.entry(conversation_id.to_string()).or_default())
    }

    /// True while a `send` for this conversation is in progress.
    pub fn is_processing(&self, conversation_id: &str) -> bool {
        self.lanes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(conversation_id)
            .map(|lane| lane.try_lock().is_err())
            .unwrap_or(false)
    }

    pub fn history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.store.history(conversation_id)
    }

    pub fn conversations(&self) -> Vec<String> {
        self.store.conversation_ids()
    }

    /// Forget a conversation's messages. Returns the number dropped.
    ///
    /// The conversation's lane stays, so a `send` still in flight keeps its
    /// place ahead of later ones.
    pub fn clear(&self, conversation_id: &str) -> usize {
        self.store.remove(conversation_id)
    }
}
