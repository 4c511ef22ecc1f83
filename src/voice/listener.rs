//! Listening for one spoken command

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::phrase::{PhraseDetector, PhraseState, calculate_energy, calibrated_threshold};
use super::stt::SpeechToText;
use crate::config::{Config, ListenConfig};
use crate::{Error, Result};

/// How often the capture buffer is drained
const DRAIN_INTERVAL: Duration = Duration::from_millis(30);

/// Result of one listen attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    /// Recognized text, lower-case
    Heard(String),
    /// Nothing was said, or nothing could be understood
    NoSpeech,
    /// The microphone or the recognition service failed
    Failed(String),
}

/// Produces one command per call
#[async_trait]
pub trait Listener: Send + Sync {
    /// Wait for the next command
    async fn listen(&self) -> ListenOutcome;
}

/// Listens on the default microphone and transcribes remotely
pub struct MicrophoneListener {
    config: ListenConfig,
    stt: SpeechToText,
}

impl MicrophoneListener {
    /// Create a listener
    #[must_use]
    pub const fn new(config: ListenConfig, stt: SpeechToText) -> Self {
        Self { config, stt }
    }

    /// Create a listener from the full configuration
    ///
    /// # Errors
    ///
    /// Returns error if the transcription provider is not configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let stt = SpeechToText::from_config(&config.listen, &config.language, &config.api_keys)?;
        Ok(Self::new(config.listen.clone(), stt))
    }
}

#[async_trait]
impl Listener for MicrophoneListener {
    async fn listen(&self) -> ListenOutcome {
        let config = self.config.clone();
        let recorded = match tokio::task::spawn_blocking(move || record_phrase(&config)).await {
            Ok(Ok(recorded)) => recorded,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "microphone capture failed");
                return ListenOutcome::Failed(e.to_string());
            }
            Err(e) => return ListenOutcome::Failed(format!("capture task failed: {e}")),
        };

        let Some(samples) = recorded else {
            return ListenOutcome::NoSpeech;
        };

        let wav = match samples_to_wav(&samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => return ListenOutcome::Failed(e.to_string()),
        };

        match self.stt.transcribe(&wav).await {
            Ok(text) => {
                let text = text.trim().to_lowercase();
                if text.is_empty() {
                    tracing::debug!("nothing recognized");
                    ListenOutcome::NoSpeech
                } else {
                    tracing::info!(command = %text, "heard");
                    ListenOutcome::Heard(text)
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "transcription failed");
                ListenOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Capture one phrase; `None` when no speech started before the timeout
fn record_phrase(config: &ListenConfig) -> Result<Option<Vec<f32>>> {
    let mut capture = AudioCapture::new()?;
    capture.start()?;

    std::thread::sleep(config.ambient_noise);
    let ambient = calculate_energy(&capture.take_buffer());
    let threshold = calibrated_threshold(config.energy_threshold, ambient, config.dynamic_energy);
    tracing::debug!(ambient, threshold, "calibrated for ambient noise");

    let mut detector = PhraseDetector::new(threshold, config.timeout, config.phrase_limit);
    // Slack over timeout + phrase limit in case the device stops delivering
    let deadline = Instant::now() + config.timeout + config.phrase_limit + Duration::from_secs(2);

    loop {
        std::thread::sleep(DRAIN_INTERVAL);
        match detector.push(&capture.take_buffer()) {
            PhraseState::Waiting | PhraseState::Recording => {}
            PhraseState::TimedOut => return Ok(None),
            PhraseState::Complete => break,
        }
        if Instant::now() >= deadline {
            return Err(Error::Audio("microphone stopped delivering audio".to_string()));
        }
    }

    capture.stop();
    Ok(Some(detector.into_phrase()))
}
