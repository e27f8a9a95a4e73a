//! # docchat core
//!
//! Runtime-free logic for grounded document chat: data models, word
//! chunking, the in-memory vector index, model traits, prompt handling,
//! the deterministic fallback responder, project-context assembly, and
//! conversation logs.
//!
//! This crate contains no tokio, network, or filesystem code. The
//! `docchat` app crate supplies concrete models and drives the pipeline.

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod generation;
pub mod index;
pub mod models;
pub mod session;

pub use error::RagError;
