//! Web actions backed by the desktop browser and Wikipedia

mod wikipedia;

use async_trait::async_trait;

pub use wikipedia::{DEFAULT_SENTENCES, Encyclopedia, Summary, first_sentences};

use super::WebActions;
use super::browser::{google_search_url, open_url, youtube_search_url};
use crate::LookupError;

/// Opens searches in the default browser and reads Wikipedia summaries
pub struct DesktopWeb {
    encyclopedia: Encyclopedia,
}

impl DesktopWeb {
    /// Create web actions using the `lang` Wikipedia edition
    #[must_use]
    pub fn new(encyclopedia_lang: &str) -> Self {
        Self {
            encyclopedia: Encyclopedia::new(encyclopedia_lang),
        }
    }
}

#[async_trait]
impl WebActions for DesktopWeb {
    async fn search_web(&self, query: &str) -> crate::Result<()> {
        open_url(&google_search_url(query))
    }

    async fn play_video(&self, query: &str) -> crate::Result<()> {
        open_url(&youtube_search_url(query))
    }

    async fn encyclopedia_summary(&self, query: &str) -> Result<Summary, LookupError> {
        self.encyclopedia.summary(query).await
    }
}
