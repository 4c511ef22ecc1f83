//! Voice input and output
//!
//! Input: microphone capture, phrase endpointing and remote transcription
//! behind the [`Listener`] trait. Output: synthesis behind [`Synthesizer`]
//! and the interruptible [`SpeechPipeline`] that plays it.

mod capture;
mod listener;
mod phrase;
mod playback;
mod speech_text;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use listener::{ListenOutcome, Listener, MicrophoneListener};
pub use phrase::{PhraseDetector, PhraseState, calculate_energy, calibrated_threshold};
pub use playback::{PlayerCommand, PlayerResolver, SessionState, SpeechHandle, SpeechPipeline};
pub use speech_text::clean_for_speech;
pub use stt::SpeechToText;
pub use tts::{
    GOOGLE_CHUNK_CHARS, GoogleTts, OpenAiTts, Synthesizer, chunk_text, synthesizer_from_config,
    write_temp_audio,
};

use crate::Result;
use crate::config::Config;

/// Start the speech pipeline described by the configuration
///
/// # Errors
///
/// Returns error if the synthesis provider is not configured
pub fn speech_from_config(config: &Config) -> Result<SpeechHandle> {
    let synthesizer = synthesizer_from_config(config)?;
    let players = PlayerResolver::new(&config.speech.players);
    Ok(SpeechPipeline::spawn(
        synthesizer,
        players,
        config.speech.poll_interval,
    ))
}
