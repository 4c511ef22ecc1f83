//! TOML configuration file loading
//!
//! Supports `~/.config/aura/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct AuraConfigFile {
    /// Language codes
    #[serde(default)]
    pub language: LanguageFileConfig,

    /// Microphone and recognition settings
    #[serde(default)]
    pub listen: ListenFileConfig,

    /// Speech output settings
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Trigger phrases for routing
    #[serde(default)]
    pub keywords: KeywordsFileConfig,

    /// Chat backend settings
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// Application launcher settings
    #[serde(default)]
    pub launcher: LauncherFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Language codes
#[derive(Debug, Default, Deserialize)]
pub struct LanguageFileConfig {
    /// Recognition language (e.g. "es-ES")
    pub voice: Option<String>,
    /// Synthesis language (e.g. "es")
    pub speech: Option<String>,
    /// Encyclopedia language edition (e.g. "es")
    pub encyclopedia: Option<String>,
}

/// Microphone and recognition settings
#[derive(Debug, Default, Deserialize)]
pub struct ListenFileConfig {
    pub energy_threshold: Option<f32>,
    pub dynamic_energy: Option<bool>,
    pub ambient_noise_secs: Option<f32>,
    pub timeout_secs: Option<f32>,
    pub phrase_limit_secs: Option<f32>,
    pub barge_in: Option<bool>,
    pub settle_delay_ms: Option<u64>,
    /// "whisper" or "deepgram"
    pub stt_provider: Option<String>,
    pub stt_model: Option<String>,
}

/// Speech output settings
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Player command lines in preference order
    pub players: Option<Vec<String>>,
    pub poll_interval_ms: Option<u64>,
    /// "google" or "openai"
    pub tts_provider: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_model: Option<String>,
}

/// Trigger phrase lists
#[derive(Debug, Default, Deserialize)]
pub struct KeywordsFileConfig {
    pub exit: Option<Vec<String>>,
    pub google: Option<Vec<String>>,
    pub youtube: Option<Vec<String>>,
    pub wikipedia: Option<Vec<String>>,
    pub open: Option<Vec<String>>,
    pub filler: Option<Vec<String>>,
}

/// Chat backend settings
#[derive(Debug, Default, Deserialize)]
pub struct ChatFileConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Application launcher settings
#[derive(Debug, Default, Deserialize)]
pub struct LauncherFileConfig {
    /// Fall through to chat when no application matches
    pub fallback_to_chat: Option<bool>,
    /// Extra name → command entries
    #[serde(default)]
    pub programs: BTreeMap<String, String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openrouter: Option<String>,
    pub openai: Option<String>,
    pub deepgram: Option<String>,
}

/// Load the TOML config file from `path`, or from the standard path
///
/// Returns `AuraConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file(path: Option<&Path>) -> AuraConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return AuraConfigFile::default();
    };

    if !path.exists() {
        return AuraConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                AuraConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AuraConfigFile::default()
        }
    }
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the TOML is malformed
pub fn parse_config(content: &str) -> crate::Result<AuraConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/aura/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("aura").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_file() {
        let fc = parse_config(
            r#"
[language]
speech = "en"

[keywords]
exit = ["goodbye", "quit"]

[launcher]
fallback_to_chat = true

[launcher.programs]
editor = "kate"
"#,
        )
        .unwrap();

        assert_eq!(fc.language.speech.as_deref(), Some("en"));
        assert!(fc.language.voice.is_none());
        assert_eq!(fc.keywords.exit.unwrap(), vec!["goodbye", "quit"]);
        assert!(fc.keywords.google.is_none());
        assert_eq!(fc.launcher.fallback_to_chat, Some(true));
        assert_eq!(fc.launcher.programs.get("editor").map(String::as_str), Some("kate"));
    }

    #[test]
    fn test_parse_empty_file() {
        let fc = parse_config("").unwrap();
        assert!(fc.speech.players.is_none());
        assert!(fc.launcher.programs.is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        assert!(parse_config("[listen]\ntimeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let fc = load_config_file(Some(&dir.path().join("absent.toml")));
        assert!(fc.chat.model.is_none());
    }
}
