//! Per-session conversation history
//!
//! Holds the latest message list submitted for each session key so chat
//! turns keep continuity. Every `put` replaces the previous history; nothing
//! expires on its own.

use crate::message::ChatMessage;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory map of session key to message history
#[derive(Default)]
pub struct ConversationStore {
    contexts: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored history for a session
    pub async fn put(&self, session_key: &str, messages: Vec<ChatMessage>) {
        debug!("Storing {} messages for session {}", messages.len(), session_key);
        self.contexts
            .write()
            .await
            .insert(session_key.to_string(), messages);
    }

    /// Latest history for a session
    pub async fn get(&self, session_key: &str) -> Option<Vec<ChatMessage>> {
        self.contexts.read().await.get(session_key).cloned()
    }

    /// Remove one session, returning whether it existed
    pub async fn clear(&self, session_key: &str) -> bool {
        self.contexts.write().await.remove(session_key).is_some()
    }

    /// Remove every session, returning how many were dropped
    pub async fn clear_all(&self) -> usize {
        let mut contexts = self.contexts.write().await;
        let count = contexts.len();
        contexts.clear();
        count
    }

    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contexts.read().await.is_empty()
    }

    /// Session keys in lexical order
    pub async fn session_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.contexts.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}
