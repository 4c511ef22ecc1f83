//! `OpenRouter` chat completions (OpenAI-compatible API)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ChatBackend, strip_asterisks};
use crate::ChatError;
use crate::config::ChatConfig;

/// Request timeout for a single completion
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Chat backend speaking the `/chat/completions` protocol
pub struct OpenRouterChat {
    client: Client,
    api_key: Option<SecretString>,
    config: ChatConfig,
}

impl OpenRouterChat {
    /// Create a backend; a missing key makes every call fail with [`ChatError::Unconfigured`]
    #[must_use]
    pub fn new(api_key: Option<SecretString>, config: ChatConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            config,
        }
    }

    /// Whether an API key is present
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Configured model identifier
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ChatBackend for OpenRouterChat {
    async fn complete(&self, prompt: &str) -> Result<String, ChatError> {
        let Some(api_key) = &self.api_key else {
            tracing::warn!("chat backend has no API key");
            return Err(ChatError::Unconfigured);
        };

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };

        tracing::info!(
            model = %self.config.model,
            prompt = %truncate(prompt, 50),
            "requesting chat completion"
        );

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Other(format!("failed to parse chat response: {e}")))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| strip_asterisks(&t))
            .filter(|t| !t.trim().is_empty())
            .ok_or(ChatError::Empty)?;

        tracing::debug!(response_len = text.len(), "chat completion received");
        Ok(text.trim().to_string())
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}

/// Map an HTTP failure status to a chat error
fn classify_status(status: StatusCode, body: &str) -> ChatError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ChatError::Auth(format!("{status}: {body}"))
        }
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ChatError::Network(format!("{status}: {body}"))
        }
        _ => ChatError::Other(format!("chat API error {status}: {body}")),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            ChatError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            ChatError::Network(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "bad"),
            ChatError::Other(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_unconfigured() {
        let chat = OpenRouterChat::new(None, ChatConfig::default());
        assert!(!chat.is_configured());
        assert_eq!(chat.complete("hola").await, Err(ChatError::Unconfigured));
    }

    #[test]
    fn test_response_parsing() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"**Hola**"}}]}"#,
        )
        .unwrap();
        let content = parsed.choices[0].message.content.as_deref().unwrap();
        assert_eq!(strip_asterisks(content), "Hola");
    }
}
