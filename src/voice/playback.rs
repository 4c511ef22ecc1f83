//! Speech output pipeline
//!
//! One background task takes utterances off a FIFO queue, synthesizes each
//! one, and plays it through an external player process. The player handle
//! and the "playing" flag live behind a single mutex so that checking
//! whether the child is alive and killing it never race.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use super::speech_text::clean_for_speech;
use super::tts::Synthesizer;

/// Players tried after the configured preferences
const FALLBACK_PLAYERS: &[&str] = &["ffplay -nodisp -autoexit -loglevel quiet", "mpg123"];

/// Lifecycle of the utterance being handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing in flight
    #[default]
    Idle,
    /// Waiting for the synthesizer
    Synthesizing,
    /// Player process running
    Playing,
    /// Player being terminated
    Stopping,
}

/// A player program and its arguments; the audio path is appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    /// Program name or path
    pub program: PathBuf,
    /// Arguments before the audio path
    pub args: Vec<String>,
}

impl PlayerCommand {
    /// Parse a whitespace-separated command line
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self {
            program: PathBuf::from(program),
            args: parts.map(ToString::to_string).collect(),
        })
    }
}

/// Picks the first installed player from a preference list
#[derive(Debug, Clone)]
pub struct PlayerResolver {
    candidates: Vec<PlayerCommand>,
}

impl PlayerResolver {
    /// Configured preferences followed by the built-in fallbacks
    #[must_use]
    pub fn new(preferences: &[String]) -> Self {
        let candidates = preferences
            .iter()
            .map(String::as_str)
            .chain(FALLBACK_PLAYERS.iter().copied())
            .filter_map(PlayerCommand::parse)
            .collect();
        Self { candidates }
    }

    /// Only the given preferences, no fallbacks
    #[must_use]
    pub fn exact(preferences: &[String]) -> Self {
        Self {
            candidates: preferences
                .iter()
                .filter_map(|p| PlayerCommand::parse(p))
                .collect(),
        }
    }

    /// First candidate found on `PATH` (or at its absolute path)
    #[must_use]
    pub fn resolve(&self) -> Option<PlayerCommand> {
        self.candidates.iter().find_map(|candidate| {
            which::which(&candidate.program)
                .ok()
                .map(|program| PlayerCommand {
                    program,
                    args: candidate.args.clone(),
                })
        })
    }
}

#[derive(Debug, Default)]
struct Playback {
    child: Option<Child>,
    playing: bool,
    state: SessionState,
}

struct Shared {
    playback: Mutex<Playback>,
    cancel: AtomicBool,
    pending: AtomicUsize,
    idle: Notify,
    sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    closed: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn playback(&self) -> MutexGuard<'_, Playback> {
        self.playback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        self.playback().state = state;
    }

    fn finish_item(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.idle.notify_waiters();
    }
}

/// Spawns the speech worker
pub struct SpeechPipeline;

impl SpeechPipeline {
    /// Start the worker on the current Tokio runtime
    #[must_use]
    pub fn spawn(
        synthesizer: Arc<dyn Synthesizer>,
        players: PlayerResolver,
        poll_interval: Duration,
    ) -> SpeechHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            playback: Mutex::new(Playback::default()),
            cancel: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
            sender: Mutex::new(Some(tx)),
            closed: AtomicBool::new(false),
            worker: Mutex::new(None),
        });

        let worker = Worker {
            shared: Arc::clone(&shared),
            synthesizer,
            players,
            poll_interval,
        };
        let handle = tokio::spawn(worker.run(rx));
        *shared.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        tracing::debug!(poll_ms = poll_interval.as_millis(), "speech pipeline started");
        SpeechHandle { shared }
    }
}

/// Cloneable control surface of the speech pipeline
#[derive(Clone)]
pub struct SpeechHandle {
    shared: Arc<Shared>,
}

impl SpeechHandle {
    /// Queue `text` for speaking; returns `false` if there was nothing to say
    /// or the pipeline is shut down. Never blocks.
    #[must_use]
    pub fn enqueue(&self, text: &str) -> bool {
        let text = clean_for_speech(text);
        if text.is_empty() {
            return false;
        }

        let sender = self
            .shared
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            tracing::warn!("speech pipeline is shut down, dropping utterance");
            return false;
        };

        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if tx.send(text).is_err() {
            tracing::warn!("speech worker is gone, dropping utterance");
            self.shared.finish_item();
            return false;
        }
        true
    }

    /// Whether a player process is running right now
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.shared.playback().playing
    }

    /// Cancel the current utterance; queued ones still play
    pub fn stop(&self) {
        self.shared.cancel.store(true, Ordering::SeqCst);

        let mut playback = self.shared.playback();
        if let Some(child) = playback.child.as_mut() {
            if let Err(e) = child.start_kill() {
                tracing::debug!(error = %e, "player already gone");
            }
            playback.state = SessionState::Stopping;
            tracing::debug!("playback stop requested");
        }
        playback.playing = false;
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.playback().state
    }

    /// Utterances queued or in flight
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Resolve once nothing is queued or playing
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Close the queue, let the current utterance finish, and wait for the
    /// worker to exit. Queued utterances that have not started are dropped.
    pub async fn shutdown(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        drop(
            self.shared
                .sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let worker = self
            .shared
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(worker) = worker else {
            return;
        };
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "speech worker panicked");
        }
    }
}

/// Next step of the liveness poll
enum PlayerStep {
    Running,
    Exited,
    Cancelled(Option<Child>),
}

struct Worker {
    shared: Arc<Shared>,
    synthesizer: Arc<dyn Synthesizer>,
    players: PlayerResolver,
    poll_interval: Duration,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<String>) {
        while let Some(text) = rx.recv().await {
            if self.shared.closed.load(Ordering::SeqCst) {
                tracing::debug!("dropping queued utterance after shutdown");
            } else {
                self.speak(&text).await;
            }
            self.shared.set_state(SessionState::Idle);
            self.shared.finish_item();
        }
        tracing::debug!("speech pipeline stopped");
    }

    async fn speak(&self, text: &str) {
        self.shared.cancel.store(false, Ordering::SeqCst);
        self.shared.set_state(SessionState::Synthesizing);

        let audio = match self.synthesizer.synthesize(text).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(error = %e, "speech synthesis failed, skipping");
                return;
            }
        };

        if self.shared.cancel.load(Ordering::SeqCst) {
            tracing::debug!("utterance cancelled before playback");
            let _ = audio.close();
            return;
        }

        let Some(player) = self.players.resolve() else {
            tracing::error!("no audio player found, skipping utterance");
            let _ = audio.close();
            return;
        };

        let spawned = {
            let mut playback = self.shared.playback();
            if self.shared.cancel.load(Ordering::SeqCst) {
                false
            } else {
                match Command::new(&player.program)
                    .args(&player.args)
                    .arg(&*audio)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .kill_on_drop(true)
                    .spawn()
                {
                    Ok(child) => {
                        tracing::debug!(player = %player.program.display(), pid = ?child.id(), "player started");
                        playback.child = Some(child);
                        playback.playing = true;
                        playback.state = SessionState::Playing;
                        true
                    }
                    Err(e) => {
                        tracing::error!(player = %player.program.display(), error = %e, "failed to start player, skipping");
                        false
                    }
                }
            }
        };

        if spawned {
            self.wait_for_player().await;
        }

        let _ = audio.close();
    }

    async fn wait_for_player(&self) {
        loop {
            tokio::time::sleep(self.poll_interval).await;

            let step = {
                let mut playback = self.shared.playback();
                if self.shared.cancel.load(Ordering::SeqCst) {
                    playback.state = SessionState::Stopping;
                    playback.playing = false;
                    PlayerStep::Cancelled(playback.child.take())
                } else {
                    let exited = playback
                        .child
                        .as_mut()
                        .is_none_or(|child| !matches!(child.try_wait(), Ok(None)));
                    if exited {
                        playback.child = None;
                        playback.playing = false;
                        PlayerStep::Exited
                    } else {
                        PlayerStep::Running
                    }
                }
            };

            match step {
                PlayerStep::Running => {}
                PlayerStep::Exited => {
                    tracing::debug!("player finished");
                    return;
                }
                PlayerStep::Cancelled(child) => {
                    if let Some(mut child) = child {
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                    }
                    tracing::info!("playback interrupted");
                    return;
                }
            }
        }
    }
}
