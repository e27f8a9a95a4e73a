//! Core data models shared by the pipeline and its callers.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// A bounded slice of document text, optionally carrying its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position of the chunk in the source text, starting at 0.
    pub index: usize,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A chunk returned from a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub index: usize,
    pub text: String,
    /// Cosine similarity to the query vector, in `[-1.0, 1.0]`.
    pub score: f32,
}

/// How an [`Answer`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// Generated by the model from retrieved chunks.
    Grounded,
    /// Retrieval found nothing to ground an answer on.
    NoRelevantContext,
    /// Produced by the deterministic fallback responder.
    Fallback,
}

/// The text returned to the user plus enough status to flag ungrounded replies.
///
/// Serializes as `{ "text", "grounded", "kind" }`; `grounded` is derived
/// from `kind` and ignored when reading one back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Answer {
    pub text: String,
    pub kind: AnswerKind,
}

impl Answer {
    pub fn grounded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: AnswerKind::Grounded,
        }
    }

    pub fn no_relevant_context() -> Self {
        Self {
            text: NO_RELEVANT_INFO.to_string(),
            kind: AnswerKind::NoRelevantContext,
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: AnswerKind::Fallback,
        }
    }

    /// True only for model answers backed by at least one retrieved chunk.
    pub fn is_grounded(&self) -> bool {
        self.kind == AnswerKind::Grounded
    }
}

impl Serialize for Answer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Answer", 3)?;
        state.serialize_field("text", &self.text)?;
        state.serialize_field("grounded", &self.is_grounded())?;
        state.serialize_field("kind", &self.kind)?;
        state.end()
    }
}

/// Reply used when retrieval returns no chunks.
pub const NO_RELEVANT_INFO: &str =
    "I couldn't find relevant information in the document to answer your question.";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a conversation log. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_serializes_grounded_flag() {
        let json = serde_json::to_value(Answer::grounded("Ada signed it.")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "text": "Ada signed it.", "grounded": true, "kind": "grounded" })
        );

        let json = serde_json::to_value(Answer::no_relevant_context()).unwrap();
        assert_eq!(json["grounded"], false);
        assert_eq!(json["kind"], "no_relevant_context");
    }

    #[test]
    fn test_answer_reads_back_from_kind() {
        let answer: Answer = serde_json::from_str(
            r#"{ "text": "offline", "grounded": true, "kind": "fallback" }"#,
        )
        .unwrap();
        assert_eq!(answer, Answer::fallback("offline"));
        assert!(!answer.is_grounded());
    }
}
