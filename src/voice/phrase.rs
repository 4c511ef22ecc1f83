//! Phrase endpointing
//!
//! Energy-based detection of one spoken phrase in a sample stream: wait for
//! speech to start, record it, and stop after trailing silence or when the
//! phrase gets too long.

use std::time::Duration;

use super::capture::SAMPLE_RATE;

/// Analysis frame (30 ms at 16 kHz)
pub const FRAME_SAMPLES: usize = 480;

/// Silence that ends a phrase
pub const PAUSE: Duration = Duration::from_millis(800);

/// Factor applied to the measured ambient level when `dynamic_energy` is set
pub const AMBIENT_FACTOR: f32 = 1.5;

/// Where the detector is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseState {
    /// Waiting for speech to start
    Waiting,
    /// Recording speech
    Recording,
    /// No speech before the timeout
    TimedOut,
    /// A phrase was captured
    Complete,
}

/// Detects a single phrase
#[derive(Debug)]
pub struct PhraseDetector {
    threshold: f32,
    timeout_samples: usize,
    limit_samples: usize,
    pause_samples: usize,
    state: PhraseState,
    waited: usize,
    silence: usize,
    phrase: Vec<f32>,
    pending: Vec<f32>,
}

impl PhraseDetector {
    /// Create a detector
    ///
    /// * `threshold` - RMS level that counts as speech
    /// * `timeout` - how long to wait for speech to start
    /// * `phrase_limit` - maximum phrase length
    #[must_use]
    pub fn new(threshold: f32, timeout: Duration, phrase_limit: Duration) -> Self {
        Self {
            threshold,
            timeout_samples: samples_for(timeout),
            limit_samples: samples_for(phrase_limit),
            pause_samples: samples_for(PAUSE),
            state: PhraseState::Waiting,
            waited: 0,
            silence: 0,
            phrase: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Feed captured samples; returns the state afterwards
    pub fn push(&mut self, samples: &[f32]) -> PhraseState {
        self.pending.extend_from_slice(samples);

        let mut consumed = 0;
        while self.pending.len() - consumed >= FRAME_SAMPLES && !self.is_done() {
            let frame = &self.pending[consumed..consumed + FRAME_SAMPLES];
            let is_speech = calculate_energy(frame) >= self.threshold;

            match self.state {
                PhraseState::Waiting => {
                    if is_speech {
                        tracing::trace!("speech started");
                        self.state = PhraseState::Recording;
                        self.phrase.extend_from_slice(frame);
                    } else {
                        self.waited += FRAME_SAMPLES;
                        if self.waited >= self.timeout_samples {
                            tracing::debug!("no speech before timeout");
                            self.state = PhraseState::TimedOut;
                        }
                    }
                }
                PhraseState::Recording => {
                    self.phrase.extend_from_slice(frame);
                    if is_speech {
                        self.silence = 0;
                    } else {
                        self.silence += FRAME_SAMPLES;
                    }

                    if self.silence >= self.pause_samples {
                        tracing::debug!(samples = self.phrase.len(), "phrase ended by pause");
                        self.state = PhraseState::Complete;
                    } else if self.phrase.len() >= self.limit_samples {
                        tracing::debug!(samples = self.phrase.len(), "phrase hit time limit");
                        self.state = PhraseState::Complete;
                    }
                }
                PhraseState::TimedOut | PhraseState::Complete => {}
            }

            consumed += FRAME_SAMPLES;
        }

        self.pending.drain(..consumed);
        self.state
    }

    /// Whether the detector has reached a final state
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.state, PhraseState::TimedOut | PhraseState::Complete)
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> PhraseState {
        self.state
    }

    /// Take the recorded phrase, without the trailing silence
    #[must_use]
    pub fn into_phrase(mut self) -> Vec<f32> {
        let keep = self.phrase.len().saturating_sub(self.silence);
        self.phrase.truncate(keep);
        self.phrase
    }
}

/// Speech threshold after ambient calibration
#[must_use]
pub fn calibrated_threshold(configured: f32, ambient: f32, dynamic: bool) -> f32 {
    if dynamic {
        configured.max(ambient * AMBIENT_FACTOR)
    } else {
        configured
    }
}

/// RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

fn samples_for(duration: Duration) -> usize {
    let samples = duration.as_millis() * u128::from(SAMPLE_RATE) / 1000;
    usize::try_from(samples).unwrap_or(usize::MAX)
}
