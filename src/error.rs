//! Error types for Aura

use thiserror::Error;

/// Result type alias for Aura operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Aura
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Speech pipeline error
    #[error("speech error: {0}")]
    Speech(String),

    /// Listen loop error (microphone or recognition service)
    #[error("listen error: {0}")]
    Listen(String),

    /// Chat backend error
    #[error("chat error: {0}")]
    Chat(#[from] ChatError),

    /// Encyclopedia lookup error
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Application launch or system utility error
    #[error("launch error: {0}")]
    Launch(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failure of a chat-completion call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// No API key configured
    #[error("chat backend is not configured")]
    Unconfigured,

    /// Rejected credentials (401/403)
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Connection, DNS or timeout failure
    #[error("network failure: {0}")]
    Network(String),

    /// Backend answered without any text
    #[error("empty response")]
    Empty,

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::Network(e.to_string())
        } else if e.status().is_some_and(|s| s.as_u16() == 401 || s.as_u16() == 403) {
            Self::Auth(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Failure of an encyclopedia lookup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No article matches the query
    #[error("no article found for {0:?}")]
    NotFound(String),

    /// The query names a disambiguation page
    #[error("ambiguous query {query:?}")]
    Ambiguous {
        /// Query as searched
        query: String,
        /// Candidate article titles
        options: Vec<String>,
    },

    /// Transport or decoding failure
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        Self::Other(e.to_string())
    }
}
