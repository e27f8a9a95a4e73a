//! # docchat
//!
//! Grounded question answering over documents and projects.
//!
//! A conversation is attached to one document or to a whole project. Each
//! question is answered by retrieval-augmented generation over the
//! document text; when the models are unavailable a deterministic offline
//! responder answers instead, so a question always gets a reply.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌────────────────┐   ┌──────────────┐
//! │ ChatService │──▶│ RagOrchestrator│──▶│ VectorIndex  │
//! │ (per conv.) │   │ chunk/embed/gen│   │ (per context)│
//! └─────────────┘   └───────┬────────┘   └──────────────┘
//!                           │
//!                 ┌─────────┴─────────┐
//!                 ▼                   ▼
//!          ┌─────────────┐     ┌─────────────┐
//!          │ModelRegistry│     │  Fallback   │
//!          │ embed + gen │     │  responder  │
//!          └─────────────┘     └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`rag`] | Answer pipeline and index cache |
//! | [`chat`] | Conversations and precondition replies |
//! | [`registry`] | Lazy, shared model lifecycle |
//! | [`flight`] | Single-flight initialization cell |
//! | [`embedding`] | Embedding providers (OpenAI, Ollama, local) |
//! | [`generation`] | Generation providers (OpenAI, Ollama) |
//! | [`documents`] | Plain-text document loading |
//! | [`commands`] | CLI command implementations |
//!
//! Pure pipeline pieces (chunking, similarity, the vector index, prompt
//! handling, the fallback responder) live in the `docchat-core` crate.

pub mod chat;
pub mod commands;
pub mod config;
pub mod documents;
pub mod embedding;
pub mod flight;
pub mod generation;
mod http;
pub mod logging;
pub mod rag;
pub mod registry;

pub use docchat_core::models::{Answer, AnswerKind};
pub use docchat_core::RagError;
