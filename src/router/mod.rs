//! Command routing
//!
//! [`Router::route`] classifies a command with the keyword table in
//! [`intent`], runs the matching side effect exactly once, and answers with
//! an [`ActionResult`] plus whether the session should continue. It never
//! fails: collaborator errors become sentences for the user.

pub mod intent;

use std::fmt;
use std::sync::Arc;

pub use intent::{ERROR_SENTINEL, Intent, classify, extract_query, normalize, strip_filler};

use crate::agent::ChatBackend;
use crate::config::Keywords;
use crate::tools::{AppLauncher, WebActions};
use crate::{ChatError, LookupError};

/// Reply when nothing usable was heard
pub const NOT_HEARD_MESSAGE: &str = "No te escuché bien.";

/// Farewell
pub const FAREWELL_MESSAGE: &str = "¡Hasta luego! Fue un placer ayudarte.";

/// Generic apology for chat failures
pub const CHAT_ERROR_MESSAGE: &str = "Lo siento, tuve un problema al procesar tu solicitud.";

/// Category of a routed command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Nothing usable was heard, or the chat backend failed
    Error,
    /// Farewell
    Exit,
    /// Web search opened
    OpenGoogle,
    /// Video search opened
    PlayYoutube,
    /// Encyclopedia summary (or an apology)
    WikipediaSummary,
    /// Application launcher answer
    System,
    /// Chat backend answer
    Text,
}

impl ActionKind {
    /// Stable lower-case tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Exit => "exit",
            Self::OpenGoogle => "open_google",
            Self::PlayYoutube => "play_youtube",
            Self::WikipediaSummary => "wikipedia_summary",
            Self::System => "system",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one command; any side effect has already happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    /// Category
    pub kind: ActionKind,
    /// Sentence to display and speak (never empty)
    pub message: String,
    /// Extracted search term, for search-like kinds
    pub query: Option<String>,
}

impl ActionResult {
    fn new(kind: ActionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            query: None,
        }
    }

    fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }
}

/// A routed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    /// What happened
    pub result: ActionResult,
    /// `false` once the user said goodbye
    pub should_continue: bool,
}

/// Keyword dispatcher over the chat, web and launcher collaborators
pub struct Router {
    keywords: Keywords,
    chat: Arc<dyn ChatBackend>,
    web: Arc<dyn WebActions>,
    launcher: Arc<dyn AppLauncher>,
}

impl Router {
    /// Create a router
    #[must_use]
    pub fn new(
        keywords: Keywords,
        chat: Arc<dyn ChatBackend>,
        web: Arc<dyn WebActions>,
        launcher: Arc<dyn AppLauncher>,
    ) -> Self {
        Self {
            keywords,
            chat,
            web,
            launcher,
        }
    }

    /// Trigger phrases in use
    #[must_use]
    pub const fn keywords(&self) -> &Keywords {
        &self.keywords
    }

    /// Route one command
    pub async fn route(&self, command: &str) -> Routed {
        let intent = classify(command, &self.keywords);
        tracing::debug!(?intent, "command classified");

        let should_continue = intent != Intent::Exit;
        let result = match intent {
            Intent::Error => ActionResult::new(ActionKind::Error, NOT_HEARD_MESSAGE),
            Intent::Exit => ActionResult::new(ActionKind::Exit, FAREWELL_MESSAGE),
            Intent::WebSearch { query } => {
                let message = match self.web.search_web(&query).await {
                    Ok(()) => {
                        tracing::info!(query = %query, "web search opened");
                        format!("Listo, busqué '{query}'.")
                    }
                    Err(e) => {
                        tracing::error!(query = %query, error = %e, "web search failed");
                        format!("Lo siento, no pude buscar '{query}' en Google.")
                    }
                };
                ActionResult::new(ActionKind::OpenGoogle, message).with_query(&query)
            }
            Intent::VideoSearch { query } => {
                let message = match self.web.play_video(&query).await {
                    Ok(()) => {
                        tracing::info!(query = %query, "video search opened");
                        format!("Reproduciendo '{query}'.")
                    }
                    Err(e) => {
                        tracing::error!(query = %query, error = %e, "video search failed");
                        format!("Lo siento, no pude buscar '{query}' en YouTube.")
                    }
                };
                ActionResult::new(ActionKind::PlayYoutube, message).with_query(&query)
            }
            Intent::Encyclopedia { query } => self.encyclopedia(&query).await,
            Intent::OpenApp => match self.launcher.launch(command).await {
                Some(message) if !message.trim().is_empty() => {
                    ActionResult::new(ActionKind::System, message)
                }
                _ => {
                    tracing::debug!("no application matched, asking chat");
                    self.chat(command).await
                }
            },
            Intent::Chat => self.chat(command).await,
        };

        Routed {
            result,
            should_continue,
        }
    }

    async fn encyclopedia(&self, query: &str) -> ActionResult {
        if query.is_empty() {
            return ActionResult::new(
                ActionKind::WikipediaSummary,
                "Por favor, dime qué quieres buscar en Wikipedia.",
            );
        }

        let message = match self.web.encyclopedia_summary(query).await {
            Ok(summary) => summary.to_message(),
            Err(e) => {
                tracing::warn!(query, error = %e, "encyclopedia lookup failed");
                lookup_error_message(&e)
            }
        };

        ActionResult::new(ActionKind::WikipediaSummary, message).with_query(query)
    }

    async fn chat(&self, command: &str) -> ActionResult {
        match self.chat.complete(command.trim()).await {
            Ok(answer) if !answer.trim().is_empty() => ActionResult::new(ActionKind::Text, answer),
            Ok(_) => {
                tracing::warn!(backend = self.chat.name(), "chat returned an empty answer");
                ActionResult::new(ActionKind::Error, chat_error_message(&ChatError::Empty))
            }
            Err(e) => {
                tracing::error!(backend = self.chat.name(), error = %e, "chat request failed");
                ActionResult::new(ActionKind::Error, chat_error_message(&e))
            }
        }
    }
}

/// Sentence for a failed chat request
#[must_use]
pub fn chat_error_message(error: &ChatError) -> String {
    match error {
        ChatError::Unconfigured => {
            "Lo siento, no puedo conectarme al servicio de chat. Configura OPENROUTER_API_KEY."
                .to_string()
        }
        ChatError::Auth(_) => "Error de autenticación con OpenRouter. Verifica que tu \
                               OPENROUTER_API_KEY sea correcta."
            .to_string(),
        ChatError::Network(_) => {
            "Error de conexión. Verifica tu conexión a internet.".to_string()
        }
        ChatError::Empty => {
            "Lo siento, no pude generar una respuesta. ¿Podrías reformular tu pregunta?"
                .to_string()
        }
        ChatError::Other(_) => CHAT_ERROR_MESSAGE.to_string(),
    }
}

/// Sentence for a failed encyclopedia lookup
#[must_use]
pub fn lookup_error_message(error: &LookupError) -> String {
    match error {
        LookupError::NotFound(query) => {
            format!("Lo siento, no pude encontrar el artículo de Wikipedia para '{query}'.")
        }
        LookupError::Ambiguous { query, options } if options.is_empty() => {
            format!("Hay varias opciones para '{query}'. ¿Podrías ser más específico?")
        }
        LookupError::Ambiguous { query, options } => format!(
            "Hay varias opciones para '{query}'. ¿Podrías ser más específico? (Opciones: {})",
            options.join(", ")
        ),
        LookupError::Other(_) => {
            "Ocurrió un error inesperado al intentar buscar en Wikipedia.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(ActionKind::OpenGoogle.to_string(), "open_google");
        assert_eq!(ActionKind::WikipediaSummary.as_str(), "wikipedia_summary");
    }

    #[test]
    fn test_chat_error_messages_are_distinct() {
        let errors = [
            ChatError::Unconfigured,
            ChatError::Auth(String::new()),
            ChatError::Network(String::new()),
            ChatError::Empty,
            ChatError::Other(String::new()),
        ];
        let mut messages: Vec<String> = errors.iter().map(chat_error_message).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), errors.len());
        assert!(messages.iter().all(|m| !m.is_empty()));
    }

    #[test]
    fn test_lookup_error_messages() {
        assert_eq!(
            lookup_error_message(&LookupError::Ambiguous {
                query: "mercurio".into(),
                options: vec!["Mercurio (planeta)".into(), "Mercurio (elemento)".into()],
            }),
            "Hay varias opciones para 'mercurio'. ¿Podrías ser más específico? \
             (Opciones: Mercurio (planeta), Mercurio (elemento))"
        );
        assert!(lookup_error_message(&LookupError::NotFound("xyz".into())).contains("'xyz'"));
    }
}
