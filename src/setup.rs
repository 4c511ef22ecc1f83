//! Interactive first-run setup wizard (`aura setup`)
//!
//! Asks for the settings most people need to change (keys, chat model,
//! speech providers) and merges them into the TOML config file, leaving
//! every other setting in the file untouched.

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, Select};

use crate::config::file::{AuraConfigFile, config_file_path, load_config_file};
use crate::config::{DEFAULT_CHAT_MODEL, SttProvider, TtsProvider};

/// Answers collected by the wizard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupAnswers {
    /// `OpenRouter` key; `None` keeps the current one
    pub openrouter_key: Option<String>,
    /// Chat model identifier
    pub chat_model: String,
    /// Transcription backend
    pub stt_provider: Option<SttProvider>,
    /// Synthesis backend
    pub tts_provider: TtsProvider,
    /// `OpenAI` key; `None` keeps the current one
    pub openai_key: Option<String>,
    /// Deepgram key; `None` keeps the current one
    pub deepgram_key: Option<String>,
}

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup(path: Option<&Path>) -> anyhow::Result<()> {
    println!("Aura Setup\n");

    let config_path = path
        .map(Path::to_path_buf)
        .or_else(config_file_path)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }
    let existing = load_config_file(Some(&config_path));

    // 1. Chat backend
    let openrouter_key = ask_key(
        "OpenRouter API key (OPENROUTER_API_KEY)",
        existing.api_keys.openrouter.as_deref(),
    )?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(
            existing
                .chat
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
        )
        .interact_text()?;

    // 2. Voice input (optional)
    let stt_provider = if Confirm::new()
        .with_prompt("Configure voice input (microphone)?")
        .default(true)
        .interact()?
    {
        let providers = ["Whisper (OpenAI)", "Deepgram"];
        let default = usize::from(existing.listen.stt_provider.as_deref() == Some("deepgram"));
        let idx = Select::new()
            .with_prompt("Speech recognition provider")
            .items(&providers)
            .default(default)
            .interact()?;
        Some(if idx == 1 {
            SttProvider::Deepgram
        } else {
            SttProvider::Whisper
        })
    } else {
        None
    };

    // 3. Voice output
    let voices = ["Google (no key needed)", "OpenAI"];
    let default = usize::from(existing.speech.tts_provider.as_deref() == Some("openai"));
    let tts_provider = if Select::new()
        .with_prompt("Speech synthesis provider")
        .items(&voices)
        .default(default)
        .interact()?
        == 1
    {
        TtsProvider::OpenAi
    } else {
        TtsProvider::Google
    };

    // 4. Keys the chosen providers need
    let needs_openai =
        stt_provider == Some(SttProvider::Whisper) || tts_provider == TtsProvider::OpenAi;
    let openai_key = if needs_openai {
        ask_key("OpenAI API key (OPENAI_API_KEY)", existing.api_keys.openai.as_deref())?
    } else {
        None
    };
    let deepgram_key = if stt_provider == Some(SttProvider::Deepgram) {
        ask_key(
            "Deepgram API key (DEEPGRAM_API_KEY)",
            existing.api_keys.deepgram.as_deref(),
        )?
    } else {
        None
    };

    let answers = SetupAnswers {
        openrouter_key,
        chat_model,
        stt_provider,
        tts_provider,
        openai_key,
        deepgram_key,
    };

    let current = std::fs::read_to_string(&config_path).unwrap_or_default();
    let merged = merge_answers(&current, &answers)?;
    write_config(&config_path, &merged)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `aura listen` to start talking, or `aura chat` to type.");

    Ok(())
}

/// Prompt for an API key, masking the current one; blank keeps it
fn ask_key(prompt: &str, existing: Option<&str>) -> anyhow::Result<Option<String>> {
    let prompt = match existing.map(mask) {
        Some(masked) => format!("{prompt} (current: {masked}, leave blank to keep)"),
        None => prompt.to_string(),
    };

    let input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    let input = input.trim();
    Ok((!input.is_empty()).then(|| input.to_string()))
}

/// Show only the ends of a secret
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Merge the wizard answers into existing TOML text
///
/// # Errors
///
/// Returns error if the existing text is not valid TOML or the result does
/// not load as an Aura config
pub fn merge_answers(existing: &str, answers: &SetupAnswers) -> anyhow::Result<String> {
    let mut doc: toml::Table = if existing.trim().is_empty() {
        toml::Table::new()
    } else {
        existing.parse()?
    };

    if let Some(key) = &answers.openrouter_key {
        set(&mut doc, "api_keys", "openrouter", key.as_str());
    }
    if let Some(key) = &answers.openai_key {
        set(&mut doc, "api_keys", "openai", key.as_str());
    }
    if let Some(key) = &answers.deepgram_key {
        set(&mut doc, "api_keys", "deepgram", key.as_str());
    }

    set(&mut doc, "chat", "model", answers.chat_model.as_str());

    if let Some(stt) = answers.stt_provider {
        let name = match stt {
            SttProvider::Whisper => "whisper",
            SttProvider::Deepgram => "deepgram",
        };
        set(&mut doc, "listen", "stt_provider", name);
    }

    let tts = match answers.tts_provider {
        TtsProvider::Google => "google",
        TtsProvider::OpenAi => "openai",
    };
    set(&mut doc, "speech", "tts_provider", tts);

    let text = toml::to_string_pretty(&doc)?;
    // Refuse to write something the loader would reject
    let _: AuraConfigFile = crate::config::file::parse_config(&text)?;
    Ok(text)
}

fn set(doc: &mut toml::Table, section: &str, key: &str, value: &str) {
    let entry = doc
        .entry(section.to_string())
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));

    if !entry.is_table() {
        *entry = toml::Value::Table(toml::Table::new());
    }
    if let toml::Value::Table(table) = entry {
        table.insert(key.to_string(), toml::Value::String(value.to_string()));
    }
}

/// Write the config file, creating its directory
fn write_config(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}
