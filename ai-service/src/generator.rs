use crate::models::ChatTurn;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque text-generation backend. Callers hand over a full message list
/// and get one completion back; connection details stay behind the trait.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, messages: &[ChatTurn]) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<ChatTurn>,
}

pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            // Gemma 2 2B; small enough to run locally.
            model: "gemma2:2b".to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, messages: &[ChatTurn]) -> Result<String> {
        let request = OllamaRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .context("chat request failed")?
            .error_for_status()
            .context("chat request returned an error status")?;

        let body: OllamaResponse = response.json().await.context("malformed chat response")?;
        let content = body
            .message
            .map(|m| m.content)
            .unwrap_or_else(|| "I apologize, but I couldn't generate a response.".to_string());

        Ok(content)
    }
}
