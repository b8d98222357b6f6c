use crate::models::ChatTurn;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Turns kept per session after trimming, not counting the system prompt.
pub const MAX_RETAINED_TURNS: usize = 10;

/// Per-session transcript the generator is prompted with. Sessions grow by
/// appended turns and are trimmed back to the system prompt plus the most
/// recent `MAX_RETAINED_TURNS` so the prompt never outgrows the model
/// context.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Seeds a new session with the system turn; existing sessions are
    /// left unchanged.
    async fn seed_if_absent(&self, session_id: &str, system: ChatTurn) -> Result<()>;
    async fn turns(&self, session_id: &str) -> Result<Vec<ChatTurn>>;
    async fn append(&self, session_id: &str, turn: ChatTurn) -> Result<()>;
    /// Keeps the first turn (the system prompt) and the last
    /// `MAX_RETAINED_TURNS` turns; a shorter session is untouched.
    async fn trim(&self, session_id: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Vec<ChatTurn>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn seed_if_absent(&self, session_id: &str, system: ChatTurn) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| vec![system]);
        Ok(())
    }

    async fn turns(&self, session_id: &str) -> Result<Vec<ChatTurn>> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    async fn append(&self, session_id: &str, turn: ChatTurn) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.entry(session_id.to_string()).or_default().push(turn);
        Ok(())
    }

    async fn trim(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(turns) = sessions.get_mut(session_id) {
            if turns.len() > MAX_RETAINED_TURNS + 1 {
                let tail = turns.split_off(turns.len() - MAX_RETAINED_TURNS);
                turns.truncate(1);
                turns.extend(tail);
            }
        }
        Ok(())
    }
}
