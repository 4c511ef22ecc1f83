//! Aura - Spanish-speaking voice and chat desktop assistant
//!
//! This library provides the core functionality for Aura:
//! - Keyword routing of spoken or typed commands
//! - Chat completions for everything else
//! - Web, encyclopedia and application actions
//! - Interruptible speech output and microphone listening
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Input                            │
//! │        Microphone (Listener)  │  Text (stdin)        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Conversation                         │
//! │   Router  │  Chat  │  Web  │  Launcher               │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Speech pipeline                         │
//! │   Queue  │  TTS  │  Player process  │  Stop          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod router;
pub mod setup;
pub mod tools;
pub mod voice;

pub use agent::{ChatBackend, OpenRouterChat};
pub use config::Config;
pub use conversation::{ConsoleSink, Conversation, ListenLoop, LoopState, ReplySink};
pub use error::{ChatError, Error, LookupError, Result};
pub use router::{ActionKind, ActionResult, Routed, Router};
pub use tools::{AppLauncher, DesktopLauncher, DesktopWeb, WebActions};
pub use voice::{ListenOutcome, Listener, SessionState, SpeechHandle, SpeechPipeline};
