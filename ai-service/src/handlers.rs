use crate::generator::TextGenerator;
use crate::models::{ChatMessage, ChatTurn};
use crate::session::SessionStore;
use crate::store::ChatHistoryStore;
use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const ASSISTANT_SYSTEM_PROMPT: &str = "You are a helpful flight booking assistant. \
    Help users with flight searches, bookings, and travel-related questions. \
    Be concise and friendly.";

const RECOMMENDER_SYSTEM_PROMPT: &str = "You are a flight recommendation expert. \
    Analyze user preferences and provide personalized flight recommendations.";

const CHAT_FALLBACK: &str =
    "I'm having trouble connecting to the AI service. Please try again later.";

const RECOMMENDATIONS_FALLBACK: &str = "Unable to generate recommendations at this time.";

#[derive(Debug, Clone)]
pub struct SendChatMessage {
    pub user_id: String,
    pub message: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SendChatMessageResponse {
    pub response: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RecommendationPreferences {
    pub origin: String,
    pub destination: String,
    pub departure_date: Option<NaiveDate>,
    pub preferred_class: Option<String>,
    pub max_budget: Option<BigDecimal>,
}

pub struct AiCommands {
    sessions: Arc<dyn SessionStore>,
    history: Arc<dyn ChatHistoryStore>,
    generator: Arc<dyn TextGenerator>,
}

impl AiCommands {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        history: Arc<dyn ChatHistoryStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            sessions,
            history,
            generator,
        }
    }

    /// Runs one chat exchange. A generator failure degrades to a fixed
    /// fallback reply; the fallback is never recorded as an assistant turn,
    /// so the transcript holds only text the model actually produced.
    pub async fn send_chat_message(
        &self,
        command: SendChatMessage,
    ) -> Result<SendChatMessageResponse> {
        let session_id = command
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.history
            .append(ChatMessage::new(
                command.user_id.clone(),
                "user",
                command.message.clone(),
                Some(session_id.clone()),
            ))
            .await?;

        self.sessions
            .seed_if_absent(&session_id, ChatTurn::system(ASSISTANT_SYSTEM_PROMPT))
            .await?;
        self.sessions
            .append(&session_id, ChatTurn::user(&command.message))
            .await?;

        let turns = self.sessions.turns(&session_id).await?;
        let response = match self.generator.generate(&turns).await {
            Ok(reply) => {
                self.sessions
                    .append(&session_id, ChatTurn::assistant(&reply))
                    .await?;
                self.sessions.trim(&session_id).await?;
                self.history
                    .append(ChatMessage::new(
                        command.user_id,
                        "assistant",
                        reply.clone(),
                        Some(session_id.clone()),
                    ))
                    .await?;
                reply
            }
            Err(e) => {
                warn!("Error generating chat response: {}", e);
                CHAT_FALLBACK.to_string()
            }
        };

        info!(session_id = %session_id, "chat exchange completed");

        Ok(SendChatMessageResponse {
            response,
            session_id,
            timestamp: Utc::now(),
        })
    }

    /// One-shot recommendation prompt; no session is kept.
    pub async fn get_flight_recommendations(
        &self,
        preferences: RecommendationPreferences,
    ) -> String {
        let mut summary = String::new();
        let _ = writeln!(summary, "Origin: {}", preferences.origin);
        let _ = writeln!(summary, "Destination: {}", preferences.destination);
        if let Some(date) = preferences.departure_date {
            let _ = writeln!(summary, "Departure Date: {}", date.format("%Y-%m-%d"));
        }
        if let Some(class) = &preferences.preferred_class {
            let _ = writeln!(summary, "Preferred Class: {}", class);
        }
        if let Some(budget) = &preferences.max_budget {
            let _ = writeln!(summary, "Maximum Budget: ${}", budget);
        }

        let prompt = format!(
            "Based on the following user preferences, provide flight recommendations:\n\n\
             {}\n\
             Please provide 3-5 specific recommendations with reasons. \
             Be concise and focus on matching the user's preferences.",
            summary
        );

        let messages = vec![
            ChatTurn::system(RECOMMENDER_SYSTEM_PROMPT),
            ChatTurn::user(&prompt),
        ];

        match self.generator.generate(&messages).await {
            Ok(recommendations) => recommendations,
            Err(e) => {
                warn!("Error generating flight recommendations: {}", e);
                RECOMMENDATIONS_FALLBACK.to_string()
            }
        }
    }

    pub async fn get_chat_history(&self, user_id: &str) -> Result<Vec<ChatMessage>> {
        self.history.get_by_user(user_id).await
    }

    pub async fn get_session_history(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        self.history.get_by_session(session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::TextGenerator;
    use crate::session::{MemorySessionStore, MAX_RETAINED_TURNS};
    use crate::store::MemoryChatHistoryStore;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, messages: &[ChatTurn]) -> Result<String> {
            let last = messages.last().expect("non-empty prompt");
            Ok(format!("echo: {}", last.content))
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _messages: &[ChatTurn]) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    fn commands(generator: Arc<dyn TextGenerator>) -> (AiCommands, Arc<MemorySessionStore>, Arc<MemoryChatHistoryStore>) {
        let sessions = Arc::new(MemorySessionStore::new());
        let history = Arc::new(MemoryChatHistoryStore::new());
        let commands = AiCommands::new(sessions.clone(), history.clone(), generator);
        (commands, sessions, history)
    }

    #[tokio::test]
    async fn chat_exchange_persists_both_turns_and_keeps_the_session() {
        let (commands, sessions, history) = commands(Arc::new(EchoGenerator));

        let response = commands
            .send_chat_message(SendChatMessage {
                user_id: "user-1".to_string(),
                message: "find me a flight to LAX".to_string(),
                session_id: None,
            })
            .await
            .unwrap();

        assert_eq!(response.response, "echo: find me a flight to LAX");

        let transcript = history.get_by_user("user-1").await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, "user");
        assert_eq!(transcript[1].role, "assistant");
        assert_eq!(transcript[1].session_id.as_deref(), Some(response.session_id.as_str()));

        let turns = sessions.turns(&response.session_id).await.unwrap();
        assert_eq!(turns[0].role, "system");
        assert_eq!(turns.len(), 3);
    }

    #[tokio::test]
    async fn reused_session_id_continues_the_same_session() {
        let (commands, sessions, _) = commands(Arc::new(EchoGenerator));

        let first = commands
            .send_chat_message(SendChatMessage {
                user_id: "user-1".to_string(),
                message: "hello".to_string(),
                session_id: Some("s1".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(first.session_id, "s1");

        commands
            .send_chat_message(SendChatMessage {
                user_id: "user-1".to_string(),
                message: "and again".to_string(),
                session_id: Some("s1".to_string()),
            })
            .await
            .unwrap();

        // system + 2 exchanges
        assert_eq!(sessions.turns("s1").await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn long_sessions_are_trimmed_to_system_plus_last_ten() {
        let (commands, sessions, _) = commands(Arc::new(EchoGenerator));

        for i in 0..8 {
            commands
                .send_chat_message(SendChatMessage {
                    user_id: "user-1".to_string(),
                    message: format!("message {}", i),
                    session_id: Some("s1".to_string()),
                })
                .await
                .unwrap();
        }

        let turns = sessions.turns("s1").await.unwrap();
        assert_eq!(turns.len(), MAX_RETAINED_TURNS + 1);
        assert_eq!(turns[0].role, "system");
        assert_eq!(turns.last().unwrap().content, "echo: message 7");
    }

    #[tokio::test]
    async fn generator_failure_returns_the_fallback_and_records_no_assistant_turn() {
        let (commands, sessions, history) = commands(Arc::new(FailingGenerator));

        let response = commands
            .send_chat_message(SendChatMessage {
                user_id: "user-1".to_string(),
                message: "hello".to_string(),
                session_id: Some("s1".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(response.response, CHAT_FALLBACK);

        let transcript = history.get_by_user("user-1").await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, "user");

        let turns = sessions.turns("s1").await.unwrap();
        assert!(turns.iter().all(|t| t.role != "assistant"));
    }

    #[tokio::test]
    async fn recommendations_prompt_includes_all_given_preferences() {
        struct Capturing(std::sync::Mutex<Vec<ChatTurn>>);

        #[async_trait]
        impl TextGenerator for Capturing {
            async fn generate(&self, messages: &[ChatTurn]) -> Result<String> {
                *self.0.lock().unwrap() = messages.to_vec();
                Ok("take the morning flight".to_string())
            }
        }

        let generator = Arc::new(Capturing(std::sync::Mutex::new(Vec::new())));
        let (commands, _, _) = commands(generator.clone());

        let recommendations = commands
            .get_flight_recommendations(RecommendationPreferences {
                origin: "JFK".to_string(),
                destination: "LAX".to_string(),
                departure_date: Some("2026-09-01".parse().unwrap()),
                preferred_class: Some("Business".to_string()),
                max_budget: Some("1200".parse().unwrap()),
            })
            .await;

        assert_eq!(recommendations, "take the morning flight");

        let captured = generator.0.lock().unwrap();
        assert_eq!(captured[0].role, "system");
        let prompt = &captured[1].content;
        assert!(prompt.contains("Origin: JFK"));
        assert!(prompt.contains("Destination: LAX"));
        assert!(prompt.contains("Departure Date: 2026-09-01"));
        assert!(prompt.contains("Preferred Class: Business"));
        assert!(prompt.contains("Maximum Budget: $1200"));
    }

    #[tokio::test]
    async fn recommendations_failure_returns_the_fallback() {
        let (commands, _, _) = commands(Arc::new(FailingGenerator));

        let recommendations = commands
            .get_flight_recommendations(RecommendationPreferences {
                origin: "JFK".to_string(),
                destination: "LAX".to_string(),
                departure_date: None,
                preferred_class: None,
                max_budget: None,
            })
            .await;

        assert_eq!(recommendations, RECOMMENDATIONS_FALLBACK);
    }

    #[tokio::test]
    async fn history_is_returned_per_user_in_timestamp_order() {
        let (commands, _, _) = commands(Arc::new(EchoGenerator));

        for message in ["first", "second"] {
            commands
                .send_chat_message(SendChatMessage {
                    user_id: "user-1".to_string(),
                    message: message.to_string(),
                    session_id: Some("s1".to_string()),
                })
                .await
                .unwrap();
        }
        commands
            .send_chat_message(SendChatMessage {
                user_id: "user-2".to_string(),
                message: "other user".to_string(),
                session_id: Some("s2".to_string()),
            })
            .await
            .unwrap();

        let transcript = commands.get_chat_history("user-1").await.unwrap();
        assert_eq!(transcript.len(), 4);
        assert!(transcript.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(transcript[0].content, "first");
        assert!(transcript.iter().all(|m| m.user_id == "user-1"));
    }
}
