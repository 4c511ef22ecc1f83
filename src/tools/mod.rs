//! Side-effecting collaborators the router delegates to
//!
//! - Web actions: search pages, video search, encyclopedia summaries
//! - Application launcher
//! - System utilities (volume, trash), used from the CLI only

pub mod browser;
pub mod launcher;
pub mod system;
pub mod web;

use async_trait::async_trait;

pub use launcher::{DesktopLauncher, LaunchOutcome, ProgramTable};
pub use web::{DesktopWeb, Encyclopedia, Summary};

use crate::LookupError;

/// Browser-facing actions
#[async_trait]
pub trait WebActions: Send + Sync {
    /// Open a web search for `query`
    async fn search_web(&self, query: &str) -> crate::Result<()>;

    /// Open a video search for `query`
    async fn play_video(&self, query: &str) -> crate::Result<()>;

    /// Fetch a short encyclopedia summary about `query`
    async fn encyclopedia_summary(&self, query: &str) -> Result<Summary, LookupError>;
}

/// Application launching
#[async_trait]
pub trait AppLauncher: Send + Sync {
    /// Launch the application named in `command`
    ///
    /// Returns a sentence for the user, or `None` when the command should
    /// be handled by someone else.
    async fn launch(&self, command: &str) -> Option<String>;
}
