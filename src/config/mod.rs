//! Configuration management for Aura
//!
//! Values are resolved as env > TOML file > default. The core components
//! only read them; nothing here is mutated after startup.

pub mod file;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

/// Default OpenAI-compatible chat endpoint
pub const DEFAULT_CHAT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default chat model
pub const DEFAULT_CHAT_MODEL: &str = "deepseek/deepseek-chat";

/// Default system prompt sent with every chat request
pub const DEFAULT_SYSTEM_PROMPT: &str = "Eres Aura, una asistente de voz amable y servicial. \
Responde siempre en español, de forma breve y conversacional, sin usar formato markdown, \
porque tus respuestas se leen en voz alta.";

/// Aura configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Language codes
    pub language: LanguageConfig,

    /// Microphone and recognition settings
    pub listen: ListenConfig,

    /// Speech output settings
    pub speech: SpeechConfig,

    /// Trigger phrases
    pub keywords: Keywords,

    /// Chat backend settings
    pub chat: ChatConfig,

    /// Application launcher settings
    pub launcher: LauncherConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Language codes
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Recognition language (BCP 47, e.g. "es-ES")
    pub voice: String,

    /// Synthesis language (e.g. "es")
    pub speech: String,

    /// Encyclopedia language edition (e.g. "es")
    pub encyclopedia: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            voice: "es-ES".to_string(),
            speech: "es".to_string(),
            encyclopedia: "es".to_string(),
        }
    }
}

/// Speech-to-text backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SttProvider {
    /// `OpenAI` Whisper transcription API
    #[default]
    Whisper,
    /// Deepgram pre-recorded API
    Deepgram,
}

/// Microphone and recognition settings
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// RMS energy above which audio counts as speech
    pub energy_threshold: f32,

    /// Raise the threshold from the measured ambient noise
    pub dynamic_energy: bool,

    /// Ambient noise calibration window
    pub ambient_noise: Duration,

    /// How long to wait for speech to start
    pub timeout: Duration,

    /// Maximum length of one phrase
    pub phrase_limit: Duration,

    /// Keep listening while speech is playing and interrupt it on a new command
    pub barge_in: bool,

    /// Pause after interrupting playback
    pub settle_delay: Duration,

    /// Transcription backend
    pub stt_provider: SttProvider,

    /// Transcription model
    pub stt_model: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.02,
            dynamic_energy: true,
            ambient_noise: Duration::from_millis(500),
            timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(10),
            barge_in: false,
            settle_delay: Duration::from_millis(300),
            stt_provider: SttProvider::Whisper,
            stt_model: "whisper-1".to_string(),
        }
    }
}

/// Text-to-speech backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsProvider {
    /// Google Translate speech endpoint (no key)
    #[default]
    Google,
    /// `OpenAI` speech API
    OpenAi,
}

/// Speech output settings
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Player command lines in preference order; the audio path is appended
    pub players: Vec<String>,

    /// Liveness poll interval for the player process
    pub poll_interval: Duration,

    /// Synthesis backend
    pub tts_provider: TtsProvider,

    /// Voice name (`OpenAI` only)
    pub tts_voice: String,

    /// Model name (`OpenAI` only)
    pub tts_model: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            players: vec![
                "mpg123 -q".to_string(),
                "ffplay -nodisp -autoexit -loglevel quiet".to_string(),
                "mpv --no-video --really-quiet".to_string(),
            ],
            poll_interval: Duration::from_millis(50),
            tts_provider: TtsProvider::Google,
            tts_voice: "alloy".to_string(),
            tts_model: "tts-1".to_string(),
        }
    }
}

/// Trigger phrases, matched as lower-case substrings
#[derive(Debug, Clone)]
pub struct Keywords {
    /// Farewell phrases that end the session
    pub exit: Vec<String>,
    /// Web search triggers
    pub google: Vec<String>,
    /// Video search triggers
    pub youtube: Vec<String>,
    /// Encyclopedia triggers
    pub wikipedia: Vec<String>,
    /// Application launch triggers
    pub open: Vec<String>,
    /// Words dropped from encyclopedia queries
    pub filler: Vec<String>,
}

impl Default for Keywords {
    fn default() -> Self {
        fn list(words: &[&str]) -> Vec<String> {
            words.iter().map(ToString::to_string).collect()
        }

        Self {
            exit: list(&["adiós", "adios", "salir", "eso es todo", "termina"]),
            google: list(&["busca en google", "buscar en google", "googlea"]),
            youtube: list(&[
                "busca en youtube",
                "buscar en youtube",
                "pon en youtube",
                "reproduce en youtube",
            ]),
            wikipedia: list(&["busca en wikipedia", "buscar en wikipedia", "wikipedia"]),
            open: list(&["abrir", "abre"]),
            filler: list(&["de", "sobre"]),
        }
    }
}

/// Chat backend settings
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Fixed system prompt
    pub system_prompt: String,
    /// Completion length cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

/// Application launcher settings
#[derive(Debug, Clone, Default)]
pub struct LauncherConfig {
    /// When no application matches, let the command fall through to chat
    pub fallback_to_chat: bool,

    /// Extra name → command entries, checked before detected programs
    pub programs: BTreeMap<String, String>,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenRouter` key (chat)
    pub openrouter: Option<SecretString>,

    /// `OpenAI` key (Whisper, speech)
    pub openai: Option<SecretString>,

    /// `Deepgram` key (optional STT)
    pub deepgram: Option<SecretString>,
}

impl Config {
    /// Load configuration from the environment and the standard config file
    #[must_use]
    pub fn load() -> Self {
        Self::load_from(None)
    }

    /// Load configuration, reading the TOML overlay from `path` when given
    #[must_use]
    pub fn load_from(path: Option<&Path>) -> Self {
        let fc = file::load_config_file(path);
        let defaults = Self::default();

        let language = LanguageConfig {
            voice: env_var("AURA_VOICE_LANG")
                .or(fc.language.voice)
                .unwrap_or(defaults.language.voice),
            speech: env_var("AURA_TTS_LANG")
                .or(fc.language.speech)
                .unwrap_or(defaults.language.speech),
            encyclopedia: fc
                .language
                .encyclopedia
                .unwrap_or(defaults.language.encyclopedia),
        };

        let d = defaults.listen;
        let stt_provider = match fc.listen.stt_provider.as_deref() {
            Some("deepgram") => SttProvider::Deepgram,
            Some("whisper") | None => SttProvider::Whisper,
            Some(other) => {
                tracing::warn!(provider = other, "unknown STT provider, using whisper");
                SttProvider::Whisper
            }
        };
        let listen = ListenConfig {
            energy_threshold: fc.listen.energy_threshold.unwrap_or(d.energy_threshold),
            dynamic_energy: fc.listen.dynamic_energy.unwrap_or(d.dynamic_energy),
            ambient_noise: secs(fc.listen.ambient_noise_secs, d.ambient_noise),
            timeout: secs(fc.listen.timeout_secs, d.timeout),
            phrase_limit: secs(fc.listen.phrase_limit_secs, d.phrase_limit),
            barge_in: fc.listen.barge_in.unwrap_or(d.barge_in),
            settle_delay: fc
                .listen
                .settle_delay_ms
                .map_or(d.settle_delay, Duration::from_millis),
            stt_provider,
            stt_model: fc.listen.stt_model.unwrap_or(d.stt_model),
        };

        let d = defaults.speech;
        let tts_provider = match env_var("AURA_TTS_PROVIDER")
            .or(fc.speech.tts_provider)
            .as_deref()
        {
            Some("openai") => TtsProvider::OpenAi,
            Some("google") | None => TtsProvider::Google,
            Some(other) => {
                tracing::warn!(provider = other, "unknown TTS provider, using google");
                TtsProvider::Google
            }
        };
        let speech = SpeechConfig {
            players: fc.speech.players.unwrap_or(d.players),
            poll_interval: fc
                .speech
                .poll_interval_ms
                .map_or(d.poll_interval, Duration::from_millis),
            tts_provider,
            tts_voice: fc.speech.tts_voice.unwrap_or(d.tts_voice),
            tts_model: fc.speech.tts_model.unwrap_or(d.tts_model),
        };

        let d = defaults.keywords;
        let keywords = Keywords {
            exit: lowercase(fc.keywords.exit).unwrap_or(d.exit),
            google: lowercase(fc.keywords.google).unwrap_or(d.google),
            youtube: lowercase(fc.keywords.youtube).unwrap_or(d.youtube),
            wikipedia: lowercase(fc.keywords.wikipedia).unwrap_or(d.wikipedia),
            open: lowercase(fc.keywords.open).unwrap_or(d.open),
            filler: lowercase(fc.keywords.filler).unwrap_or(d.filler),
        };

        let d = defaults.chat;
        let chat = ChatConfig {
            base_url: fc.chat.base_url.unwrap_or(d.base_url),
            model: env_var("AURA_CHAT_MODEL")
                .or(fc.chat.model)
                .unwrap_or(d.model),
            system_prompt: fc.chat.system_prompt.unwrap_or(d.system_prompt),
            max_tokens: fc.chat.max_tokens.unwrap_or(d.max_tokens),
            temperature: fc.chat.temperature.unwrap_or(d.temperature),
        };

        let launcher = LauncherConfig {
            fallback_to_chat: fc.launcher.fallback_to_chat.unwrap_or(false),
            programs: fc
                .launcher
                .programs
                .into_iter()
                .map(|(name, cmd)| (name.to_lowercase(), cmd))
                .collect(),
        };

        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            openrouter: env_var("OPENROUTER_API_KEY")
                .or(fc.api_keys.openrouter)
                .map(SecretString::from),
            openai: env_var("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .map(SecretString::from),
            deepgram: env_var("DEEPGRAM_API_KEY")
                .or(fc.api_keys.deepgram)
                .map(SecretString::from),
        };

        Self {
            language,
            listen,
            speech,
            keywords,
            chat,
            launcher,
            api_keys,
        }
    }
}

/// Read a non-empty environment variable
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Convert optional seconds to a duration, ignoring negative or non-finite values
fn secs(value: Option<f32>, default: Duration) -> Duration {
    value
        .and_then(|v| Duration::try_from_secs_f32(v).ok())
        .unwrap_or(default)
}

fn lowercase(words: Option<Vec<String>>) -> Option<Vec<String>> {
    words.map(|w| {
        w.into_iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
