//! Append-only conversation logs.
//!
//! [`ChatStore`] keeps one ordered message list per conversation id (a
//! document id or a project id). Messages are never edited once appended;
//! the only destructive operation is dropping a whole conversation.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{ChatMessage, Role};

/// In-memory conversation logs, safe to share between tasks.
#[derive(Debug, Default)]
pub struct ChatStore {
    conversations: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, assigning it a fresh id and the current time.
    pub fn append(&self, conversation_id: &str, role: Role, content: impl Into<String>) -> ChatMessage {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        };
        self.conversations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(conversation_id.to_string())
            .or_default()
            .push(message.clone());
        message
    }

    /// All messages of a conversation in insertion order.
    pub fn history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.conversations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop a conversation. Returns the number of messages removed.
    pub fn remove(&self, conversation_id: &str) -> usize {
        self.conversations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(conversation_id)
            .map(|msgs| msgs.len())
            .unwrap_or(0)
    }

    pub fn conversation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .conversations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_history_in_order() {
        let store = ChatStore::new();
        let a = store.append("doc-1", Role::User, "hi");
        let b = store.append("doc-1", Role::Assistant, "hello");
        let history = store.history("doc-1");
        assert_eq!(history, vec![a.clone(), b.clone()]);
        assert_ne!(a.id, b.id);
        assert!(a.timestamp <= b.timestamp);
    }

    #[test]
    fn test_conversations_are_isolated() {
        let store = ChatStore::new();
        store.append("doc-1", Role::User, "one");
        store.append("project-9", Role::User, "two");
        assert_eq!(store.history("doc-1").len(), 1);
        assert_eq!(store.history("project-9")[0].content, "two");
        assert!(store.history("missing").is_empty());
        assert_eq!(store.conversation_ids(), vec!["doc-1", "project-9"]);
    }

    #[test]
    fn test_remove_whole_conversation() {
        let store = ChatStore::new();
        store.append("doc-1", Role::User, "one");
        store.append("doc-1", Role::Assistant, "two");
        assert_eq!(store.remove("doc-1"), 2);
        assert_eq!(store.remove("doc-1"), 0);
        assert!(store.history("doc-1").is_empty());
    }

    #[test]
    fn test_role_serialization() {
        let store = ChatStore::new();
        let msg = store.append("c", Role::Assistant, "x");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "x");
    }
}
