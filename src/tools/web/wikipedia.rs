//! Encyclopedia summaries from Wikipedia
//!
//! Search the `MediaWiki` API for the best title, then fetch the REST
//! summary of that page.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::LookupError;

/// Sentences kept from an article extract
pub const DEFAULT_SENTENCES: usize = 5;

/// Options listed for an ambiguous query
const MAX_OPTIONS: usize = 5;

/// Search hits requested (first is the article, the rest are options)
const SEARCH_LIMIT: usize = MAX_OPTIONS + 1;

const USER_AGENT: &str = concat!("aura/", env!("CARGO_PKG_VERSION"));

/// A short article summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Article title
    pub title: String,
    /// First sentences of the article
    pub extract: String,
    /// Article URL
    pub url: String,
}

impl Summary {
    /// Sentence read to the user
    #[must_use]
    pub fn to_message(&self) -> String {
        format!(
            "Según Wikipedia sobre {}:\n\n{}\n\n(Fuente: {})",
            self.title, self.extract, self.url
        )
    }
}

/// Wikipedia client for one language edition
pub struct Encyclopedia {
    client: Client,
    lang: String,
    sentences: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    kind: String,
    title: String,
    #[serde(default)]
    extract: String,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

impl Encyclopedia {
    /// Create a client for the `lang` edition (e.g. "es")
    #[must_use]
    pub fn new(lang: &str) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            client,
            lang: lang.to_string(),
            sentences: DEFAULT_SENTENCES,
        }
    }

    /// Change how many sentences are kept
    #[must_use]
    pub const fn with_sentences(mut self, sentences: usize) -> Self {
        self.sentences = sentences;
        self
    }

    fn base_url(&self) -> String {
        format!("https://{}.wikipedia.org", self.lang)
    }

    /// Look up `query` and summarize the best match
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing matches, `Ambiguous` for disambiguation
    /// pages, `Other` for transport failures
    pub async fn summary(&self, query: &str) -> Result<Summary, LookupError> {
        let titles = self.search(query).await?;
        let Some(first) = titles.first() else {
            return Err(LookupError::NotFound(query.to_string()));
        };

        tracing::debug!(query, title = %first, "encyclopedia search hit");

        let url = format!("{}/api/rest_v1/page/summary/{}", self.base_url(), encode_title(first));
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(query.to_string()));
        }
        let page: PageSummary = response
            .error_for_status()?
            .json()
            .await
            .map_err(|e| LookupError::Other(format!("failed to parse summary: {e}")))?;

        interpret_summary(query, page, &titles[1..], self.sentences)
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, LookupError> {
        let url = format!("{}/w/api.php", self.base_url());
        let limit = SEARCH_LIMIT.to_string();
        let response: SearchResponse = self
            .client
            .get(&url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
                ("utf8", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| LookupError::Other(format!("failed to parse search: {e}")))?;

        Ok(response
            .query
            .map(|q| q.search.into_iter().map(|h| h.title).collect())
            .unwrap_or_default())
    }
}

/// Turn a page summary into a [`Summary`] or a lookup error
fn interpret_summary(
    query: &str,
    page: PageSummary,
    other_titles: &[String],
    sentences: usize,
) -> Result<Summary, LookupError> {
    if page.kind == "disambiguation" {
        return Err(LookupError::Ambiguous {
            query: query.to_string(),
            options: other_titles.iter().take(MAX_OPTIONS).cloned().collect(),
        });
    }

    let extract = first_sentences(&page.extract, sentences);
    if extract.is_empty() {
        return Err(LookupError::NotFound(query.to_string()));
    }

    let url = page
        .content_urls
        .and_then(|u| u.desktop)
        .map(|d| d.page)
        .unwrap_or_default();

    Ok(Summary {
        title: page.title,
        extract,
        url,
    })
}

/// Keep the first `count` sentences of `text`
#[must_use]
pub fn first_sentences(text: &str, count: usize) -> String {
    let text = text.trim();
    let mut seen = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
            if at_boundary {
                seen += 1;
                if seen == count {
                    return text[..i + c.len_utf8()].to_string();
                }
            }
        }
    }

    text.to_string()
}

/// Path segment for a page title
fn encode_title(title: &str) -> String {
    urlencoding::encode(&title.replace(' ', "_")).into_owned()
}
