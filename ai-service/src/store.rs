use crate::models::ChatMessage;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

/// Durable transcript, independent of the prompt windows in
/// [`crate::session::SessionStore`]: history keeps every turn, sessions
/// only what the generator is shown.
#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    async fn append(&self, message: ChatMessage) -> Result<()>;
    async fn get_by_session(&self, session_id: &str) -> Result<Vec<ChatMessage>>;
    async fn get_by_user(&self, user_id: &str) -> Result<Vec<ChatMessage>>;
}

#[derive(Default)]
pub struct MemoryChatHistoryStore {
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemoryChatHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatHistoryStore for MemoryChatHistoryStore {
    async fn append(&self, message: ChatMessage) -> Result<()> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }

    async fn get_by_session(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let messages = self.messages.lock().unwrap();
        let mut found: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.session_id.as_deref() == Some(session_id))
            .cloned()
            .collect();
        found.sort_by_key(|m| m.timestamp);
        Ok(found)
    }

    async fn get_by_user(&self, user_id: &str) -> Result<Vec<ChatMessage>> {
        let messages = self.messages.lock().unwrap();
        let mut found: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.timestamp);
        Ok(found)
    }
}
