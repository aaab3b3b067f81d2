/// LLM client — the single point of entry for Ollama chat calls in Sibyl.
///
/// ARCHITECTURAL RULE: No other module may call the Ollama endpoint directly.
/// All text generation goes through this module, which implements the
/// resolver's `Narrator` seam.
///
/// Calls are single-shot on purpose: a failed generation is the caller's
/// signal to substitute the fallback narrative, so retrying here would only
/// delay the report.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::insight::narrative::{NarrativeError, Narrator};

/// Non-streaming chat endpoint, relative to the configured base URL.
const CHAT_PATH: &str = "/api/chat";
/// Generation on CPU-only hosts is slow; give it plenty of room.
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Thin client for the Ollama chat API.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            model,
        }
    }

    /// Makes one non-streaming chat call and returns the reply text.
    pub async fn chat(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        };

        let response = self
            .client
            .post(chat_endpoint(&self.base_url))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat.message.content.trim().to_string();
        if content.is_empty() {
            return Err(LlmError::EmptyContent);
        }

        debug!(chars = content.len(), "chat completion received");
        Ok(content)
    }
}

#[async_trait]
impl Narrator for OllamaClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, NarrativeError> {
        self.chat(system, prompt)
            .await
            .map_err(|err| NarrativeError::Unavailable(err.to_string()))
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}{CHAT_PATH}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_endpoint_joins_cleanly() {
        assert_eq!(
            chat_endpoint("http://localhost:11434"),
            "http://localhost:11434/api/chat"
        );
    }

    #[test]
    fn test_chat_endpoint_drops_trailing_slash() {
        assert_eq!(
            chat_endpoint("http://localhost:11434/"),
            "http://localhost:11434/api/chat"
        );
    }
}
