//! Chat backend
//!
//! Free-form commands end up here. The router only sees the
//! [`ChatBackend`] trait; [`OpenRouterChat`] is the HTTP implementation.

mod openrouter;

use async_trait::async_trait;

pub use openrouter::OpenRouterChat;

use crate::ChatError;

/// Prompt used by [`verify`] to check the backend end to end
pub const VERIFY_PROMPT: &str = "Di 'OK' si me escuchas";

/// A chat-completion capability
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Answer `prompt` under the backend's fixed system prompt
    async fn complete(&self, prompt: &str) -> Result<String, ChatError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Send a probe prompt and check that the answer contains "ok"
pub async fn verify(chat: &dyn ChatBackend) -> bool {
    match chat.complete(VERIFY_PROMPT).await {
        Ok(answer) => {
            let ok = answer.to_lowercase().contains("ok");
            if ok {
                tracing::info!(backend = chat.name(), "chat backend verified");
            } else {
                tracing::warn!(backend = chat.name(), answer, "unexpected verification answer");
            }
            ok
        }
        Err(e) => {
            tracing::error!(backend = chat.name(), error = %e, "chat verification failed");
            false
        }
    }
}

/// Remove markdown emphasis markers the model tends to add
#[must_use]
pub fn strip_asterisks(text: &str) -> String {
    text.replace('*', "")
}
