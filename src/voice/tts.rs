//! Text-to-speech (TTS) processing
//!
//! Every synthesizer writes an MP3 to a temporary file and hands back its
//! [`TempPath`]; dropping or closing the path deletes the file.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tempfile::TempPath;

use crate::config::{Config, TtsProvider};
use crate::{Error, Result};

/// Longest text the Google endpoint accepts per request
pub const GOOGLE_CHUNK_CHARS: usize = 100;

const GOOGLE_TTS_URL: &str = "https://translate.google.com/translate_tts";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Turns text into a playable audio file
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` into a temporary audio file
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or writing the file fails
    async fn synthesize(&self, text: &str) -> Result<TempPath>;
}

/// Build the synthesizer selected in the configuration
///
/// # Errors
///
/// Returns error if the provider needs an API key that is missing
pub fn synthesizer_from_config(config: &Config) -> Result<Arc<dyn Synthesizer>> {
    match config.speech.tts_provider {
        TtsProvider::Google => Ok(Arc::new(GoogleTts::new(&config.language.speech))),
        TtsProvider::OpenAi => {
            let key = config.api_keys.openai.clone().ok_or_else(|| {
                Error::Config("OpenAI API key required for TTS".to_string())
            })?;
            Ok(Arc::new(OpenAiTts::new(
                key,
                config.speech.tts_voice.clone(),
                config.speech.tts_model.clone(),
            )))
        }
    }
}

/// Google Translate speech endpoint (no key, short requests)
pub struct GoogleTts {
    client: reqwest::Client,
    lang: String,
}

impl GoogleTts {
    /// Create a synthesizer speaking `lang` (e.g. "es")
    #[must_use]
    pub fn new(lang: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            lang: lang.to_string(),
        }
    }
}

#[async_trait]
impl Synthesizer for GoogleTts {
    async fn synthesize(&self, text: &str) -> Result<TempPath> {
        let chunks = chunk_text(text, GOOGLE_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(Error::Tts("nothing to synthesize".to_string()));
        }

        tracing::debug!(chunks = chunks.len(), lang = %self.lang, "synthesizing with Google");

        let total = chunks.len().to_string();
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let response = self
                .client
                .get(GOOGLE_TTS_URL)
                .header("User-Agent", BROWSER_USER_AGENT)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", self.lang.as_str()),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Tts(format!("Google TTS error {status}: {body}")));
            }

            // MP3 frames can be concatenated as is
            audio.extend_from_slice(&response.bytes().await?);
        }

        write_temp_audio(&audio).await
    }
}

/// `OpenAI` speech API
pub struct OpenAiTts {
    client: reqwest::Client,
    api_key: SecretString,
    voice: String,
    model: String,
}

impl OpenAiTts {
    /// Create a synthesizer for `voice` and `model`
    #[must_use]
    pub fn new(api_key: SecretString, voice: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
            model,
        }
    }
}

#[async_trait]
impl Synthesizer for OpenAiTts {
    async fn synthesize(&self, text: &str) -> Result<TempPath> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "mp3",
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        write_temp_audio(&audio).await
    }
}

/// Write MP3 bytes to a fresh temporary file
///
/// # Errors
///
/// Returns error if the file cannot be created or written
pub async fn write_temp_audio(audio: &[u8]) -> Result<TempPath> {
    let path = tempfile::Builder::new()
        .prefix("aura-")
        .suffix(".mp3")
        .tempfile()?
        .into_temp_path();
    tokio::fs::write(&path, audio).await?;
    Ok(path)
}

/// Split `text` into pieces of at most `max_chars` characters, breaking at
/// spaces when possible
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { word_len + 1 };
        if current_len + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_short_text() {
        assert_eq!(chunk_text("  hola   mundo ", 100), vec!["hola mundo"]);
        assert!(chunk_text("   ", 100).is_empty());
    }

    #[test]
    fn test_chunk_respects_limit_and_words() {
        let text = "uno dos tres cuatro cinco seis siete ocho";
        let chunks = chunk_text(text, 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.join(" "), text);
        assert_eq!(chunks[0], "uno dos");
    }

    #[test]
    fn test_chunk_splits_long_words() {
        let chunks = chunk_text("ab ñññññññ cd", 3);
        assert_eq!(chunks, vec!["ab", "ñññ", "ñññ", "ñ", "cd"]);
    }

    #[test]
    fn test_openai_needs_key() {
        let mut config = Config::default();
        config.speech.tts_provider = TtsProvider::OpenAi;
        assert!(matches!(
            synthesizer_from_config(&config),
            Err(Error::Config(_))
        ));

        config.speech.tts_provider = TtsProvider::Google;
        assert!(synthesizer_from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_temp_audio_is_removed_on_drop() {
        let path = write_temp_audio(b"ID3").await.unwrap();
        let owned = path.to_path_buf();
        assert!(owned.exists());
        assert_eq!(owned.extension().and_then(|e| e.to_str()), Some("mp3"));
        drop(path);
        assert!(!owned.exists());
    }
}
