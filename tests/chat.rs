//! Integration tests for conversations: precondition replies, ordering,
//! project context, and the processing flag.

use async_trait::async_trait;
use docchat::chat::{
    ChatContext, ChatService, ReplySource, NO_DOCUMENT_MESSAGE, NO_PROJECT_DOCUMENTS_MESSAGE,
};
use docchat::config::Config;
use docchat::rag::{RagOrchestrator, RagParams};
use docchat::registry::{ModelHandle, ModelRegistry};
use docchat::{AnswerKind, RagError};
use docchat_core::context::ProjectDocument;
use docchat_core::embedding::Embedder;
use docchat_core::generation::Generator;
use docchat_core::models::Role;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

struct UnitEmbedder;

#[async_trait]
impl Embedder for UnitEmbedder {
    fn model_name(&self) -> &str {
        "unit"
    }
    fn dims(&self) -> usize {
        2
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|_| vec![0.6, 0.8]).collect())
    }
}

/// Answers with the question it was asked, optionally waiting on a gate.
struct EchoGenerator {
    prompts: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
    delay: Option<Duration>,
}

impl EchoGenerator {
    fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            gate: None,
            delay: None,
        }
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let question = prompt
            .split("Question: ")
            .nth(1)
            .and_then(|rest| rest.split("\n\n").next())
            .unwrap_or("?");
        Ok(format!("{}Answer: re {}", prompt, question))
    }
}

fn service(generator: Arc<EchoGenerator>) -> ChatService {
    let registry = ModelRegistry::new(
        ModelHandle::preloaded("embedding", Arc::new(UnitEmbedder) as Arc<dyn Embedder>),
        ModelHandle::preloaded("generation", generator as Arc<dyn Generator>),
    );
    ChatService::new(Arc::new(RagOrchestrator::new(
        Arc::new(registry),
        RagParams::default(),
    )))
}

fn document(text: &str) -> ChatContext {
    ChatContext::Document(Some(text.to_string()))
}

// ─── Preconditions ──────────────────────────────────────────────────

#[tokio::test]
async fn test_document_without_text_gets_upload_message() {
    let chat = service(Arc::new(EchoGenerator::new()));

    let reply = chat.send("doc-1", "What is this?", &ChatContext::Document(None)).await;
    assert_eq!(reply.message.content, NO_DOCUMENT_MESSAGE);
    assert_eq!(reply.source, ReplySource::MissingDocuments);

    let reply = chat.send("doc-1", "Still nothing?", &document("   \n")).await;
    assert_eq!(reply.message.content, NO_DOCUMENT_MESSAGE);

    let history = chat.history("doc-1");
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_project_without_content_gets_project_message() {
    let chat = service(Arc::new(EchoGenerator::new()));

    let empty = ChatContext::Project(Vec::new());
    let reply = chat.send("proj-1", "Anything?", &empty).await;
    assert_eq!(reply.message.content, NO_PROJECT_DOCUMENTS_MESSAGE);

    let unopened = ChatContext::Project(vec![
        ProjectDocument::new("a.pdf", None),
        ProjectDocument::new("b.pdf", Some(" ".into())),
    ]);
    let reply = chat.send("proj-1", "Anything now?", &unopened).await;
    assert_eq!(reply.message.content, NO_PROJECT_DOCUMENTS_MESSAGE);
    assert!(!reply.is_grounded());
}

// ─── Answers ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_grounded_reply_recorded() {
    let chat = service(Arc::new(EchoGenerator::new()));

    let reply = chat
        .send("doc-1", "Who signed?", &document("The contract was signed by Ada."))
        .await;
    assert!(reply.is_grounded());
    assert_eq!(reply.message.content, "re Who signed?");
    assert_eq!(reply.message.role, Role::Assistant);

    let history = chat.history("doc-1");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "Who signed?");
    assert_eq!(history[1].id, reply.message.id);
    assert!(history[0].timestamp <= history[1].timestamp);
}

#[tokio::test]
async fn test_project_context_built_from_excerpts() {
    let generator = Arc::new(EchoGenerator::new());
    let chat = service(Arc::clone(&generator)).with_excerpt_chars(5);

    let project = ChatContext::Project(vec![
        ProjectDocument::new("plan.txt", Some("Roadmap for Q3 launch".into())),
        ProjectDocument::new("draft.txt", None),
        ProjectDocument::new("budget.txt", Some("Budget is tight".into())),
    ]);
    let reply = chat.send("proj-1", "What is planned?", &project).await;
    assert!(reply.is_grounded());

    let prompts = generator.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Document \"plan.txt\": Roadm..."));
    assert!(prompts[0].contains("Document \"budget.txt\": Budge..."));
    assert!(!prompts[0].contains("draft.txt"));
}

#[tokio::test]
async fn test_models_disabled_gives_fallback_reply() {
    let chat = ChatService::from_config(&Config::default());

    let reply = chat
        .send("doc-1", "Give me a summary", &document("Notes from the quarterly review."))
        .await;
    assert_eq!(reply.source, ReplySource::Answer(AnswerKind::Fallback));
    assert!(reply.message.content.contains("document discusses"));
}

#[tokio::test]
async fn test_prepare_indexes_document_context() {
    let chat = service(Arc::new(EchoGenerator::new()));

    chat.prepare(&ChatContext::Document(None)).await;
    chat.prepare(&ChatContext::Project(Vec::new())).await;
    assert_eq!(chat.rag().cached_contexts(), 0);

    chat.prepare(&document("Minutes of the board meeting.")).await;
    assert!(chat.rag().is_indexed("Minutes of the board meeting."));
    assert!(chat.history("doc-1").is_empty());
}

// ─── Ordering ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_messages_appended_in_send_order() {
    let generator = Arc::new(EchoGenerator {
        delay: Some(Duration::from_millis(50)),
        ..EchoGenerator::new()
    });
    let chat = service(generator);
    let ctx = document("Shipping notes for the spring release.");

    let (first, second) = tokio::join!(
        chat.send("doc-1", "first", &ctx),
        chat.send("doc-1", "second", &ctx)
    );
    assert_eq!(first.message.content, "re first");
    assert_eq!(second.message.content, "re second");

    let contents: Vec<String> = chat
        .history("doc-1")
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["first", "re first", "second", "re second"]);
}

#[tokio::test]
async fn test_processing_flag_per_conversation() {
    let gate = Arc::new(Notify::new());
    let generator = Arc::new(EchoGenerator {
        gate: Some(Arc::clone(&gate)),
        ..EchoGenerator::new()
    });
    let chat = Arc::new(service(generator));
    assert!(!chat.is_processing("doc-1"));

    let task = {
        let chat = Arc::clone(&chat);
        tokio::spawn(async move {
            chat.send("doc-1", "slow question", &document("Some text."))
                .await
        })
    };
    while !chat.is_processing("doc-1") {
        tokio::task::yield_now().await;
    }
    assert!(!chat.is_processing("doc-2"));

    gate.notify_one();
    let reply = task.await.unwrap();
    assert!(reply.is_grounded());
    assert!(!chat.is_processing("doc-1"));
}

#[tokio::test]
async fn test_clear_drops_conversation() {
    let chat = service(Arc::new(EchoGenerator::new()));
    chat.send("doc-1", "q", &document("text")).await;
    chat.send("doc-2", "q", &document("text")).await;

    assert_eq!(chat.conversations(), vec!["doc-1", "doc-2"]);
    assert_eq!(chat.clear("doc-1"), 2);
    assert!(chat.history("doc-1").is_empty());
    assert_eq!(chat.conversations(), vec!["doc-2"]);
}

#[tokio::test]
async fn test_clear_keeps_in_flight_turn_ahead() {
    let gate = Arc::new(Notify::new());
    let generator = Arc::new(EchoGenerator {
        gate: Some(Arc::clone(&gate)),
        ..EchoGenerator::new()
    });
    let chat = Arc::new(service(generator));
    let ctx = document("Release checklist.");

    let first = {
        let (chat, ctx) = (Arc::clone(&chat), ctx.clone());
        tokio::spawn(async move { chat.send("doc-1", "first", &ctx).await })
    };
    while !chat.is_processing("doc-1") {
        tokio::task::yield_now().await;
    }
    assert_eq!(chat.clear("doc-1"), 1);

    let second = {
        let (chat, ctx) = (Arc::clone(&chat), ctx.clone());
        tokio::spawn(async move { chat.send("doc-1", "second", &ctx).await })
    };
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!second.is_finished());
    assert!(chat.history("doc-1").is_empty());

    gate.notify_one();
    assert_eq!(first.await.unwrap().message.content, "re first");
    gate.notify_one();
    assert_eq!(second.await.unwrap().message.content, "re second");

    let contents: Vec<String> = chat
        .history("doc-1")
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["re first", "second", "re second"]);
}
