//! Conversation driver
//!
//! [`Conversation`] turns one command into a routed reply that is shown and
//! spoken. [`ListenLoop`] feeds it from a [`Listener`] and coordinates with
//! the speech pipeline so the assistant does not hear itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::config::ListenConfig;
use crate::router::{ActionResult, Routed, Router};
use crate::voice::{ListenOutcome, Listener, SpeechHandle};
use crate::{Error, Result};

/// Poll interval while waiting for playback to end before listening
const SPEAKING_POLL: Duration = Duration::from_millis(100);

/// Where replies are displayed
pub trait ReplySink: Send + Sync {
    /// Show the reply to `command`
    fn show(&self, command: &str, result: &ActionResult);

    /// Show a message that is not a reply
    fn notice(&self, text: &str);
}

/// Prints replies to stdout
pub struct ConsoleSink;

impl ReplySink for ConsoleSink {
    fn show(&self, _command: &str, result: &ActionResult) {
        println!("Aura: {}", result.message);
    }

    fn notice(&self, text: &str) {
        println!("Aura: {text}");
    }
}

/// Routes commands, shows the replies and speaks them
pub struct Conversation {
    router: Router,
    speech: Option<SpeechHandle>,
    sink: Arc<dyn ReplySink>,
}

impl Conversation {
    /// Create a conversation; without a speech handle replies are only shown
    #[must_use]
    pub fn new(router: Router, speech: Option<SpeechHandle>, sink: Arc<dyn ReplySink>) -> Self {
        Self {
            router,
            speech,
            sink,
        }
    }

    /// Speech pipeline, if any
    #[must_use]
    pub const fn speech(&self) -> Option<&SpeechHandle> {
        self.speech.as_ref()
    }

    /// Handle one command
    pub async fn handle(&self, command: &str) -> Routed {
        let routed = self.router.route(command).await;
        tracing::debug!(
            kind = %routed.result.kind,
            query = ?routed.result.query,
            should_continue = routed.should_continue,
            "command routed"
        );

        self.sink.show(command, &routed.result);
        self.speak(&routed.result.message);
        routed
    }

    /// Say something that is not a reply (greetings, notices)
    pub fn announce(&self, text: &str) {
        self.sink.notice(text);
        self.speak(text);
    }

    fn speak(&self, text: &str) {
        let Some(speech) = &self.speech else {
            return;
        };
        if !speech.enqueue(text) {
            tracing::debug!("nothing to speak");
        }
    }

    /// Wait until everything queued has been spoken
    pub async fn finish(&self) {
        if let Some(speech) = &self.speech {
            speech.wait_idle().await;
        }
    }

    fn is_playing(&self) -> bool {
        self.speech.as_ref().is_some_and(SpeechHandle::is_playing)
    }

    /// Something is queued or playing
    fn is_speaking(&self) -> bool {
        self.speech
            .as_ref()
            .is_some_and(|speech| speech.pending() > 0 || speech.is_playing())
    }

    fn interrupt(&self) {
        if let Some(speech) = &self.speech {
            speech.stop();
        }
    }
}

/// State of the listen loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Not running
    Idle,
    /// Waiting for a command
    Listening,
    /// Routing a command
    Processing,
    /// Waiting for playback to finish
    Speaking,
}

/// Continuous listen, route and speak loop
pub struct ListenLoop {
    conversation: Conversation,
    listener: Arc<dyn Listener>,
    barge_in: bool,
    settle_delay: Duration,
    state: watch::Sender<LoopState>,
}

impl ListenLoop {
    /// Create a loop
    #[must_use]
    pub fn new(conversation: Conversation, listener: Arc<dyn Listener>, config: &ListenConfig) -> Self {
        let (state, _) = watch::channel(LoopState::Idle);
        Self {
            conversation,
            listener,
            barge_in: config.barge_in,
            settle_delay: config.settle_delay,
            state,
        }
    }

    /// Watch the loop state
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    /// The conversation being driven
    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    fn set_state(&self, state: LoopState) {
        self.state.send_replace(state);
    }

    /// Run until the user says goodbye or `shutdown` fires
    ///
    /// Dropping every shutdown sender also stops the loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Listen`] when the microphone or the recognition
    /// service fails
    pub async fn run(&self, shutdown: &mut mpsc::Receiver<()>) -> Result<()> {
        tracing::info!(barge_in = self.barge_in, "listen loop started");
        let result = self.run_inner(shutdown).await;
        self.set_state(LoopState::Idle);
        result
    }

    async fn run_inner(&self, shutdown: &mut mpsc::Receiver<()>) -> Result<()> {
        loop {
            if !self.barge_in {
                while self.conversation.is_speaking() {
                    self.set_state(LoopState::Speaking);
                    tokio::select! {
                        _ = shutdown.recv() => {
                            tracing::info!("shutdown requested");
                            return Ok(());
                        }
                        () = tokio::time::sleep(SPEAKING_POLL) => {}
                    }
                }
            }

            self.set_state(LoopState::Listening);
            let outcome = tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("shutdown requested");
                    return Ok(());
                }
                outcome = self.listener.listen() => outcome,
            };

            let command = match outcome {
                ListenOutcome::Heard(command) => command,
                ListenOutcome::NoSpeech => continue,
                ListenOutcome::Failed(reason) => {
                    tracing::error!(reason = %reason, "listening failed, stopping loop");
                    return Err(Error::Listen(reason));
                }
            };

            if self.conversation.is_playing() {
                tracing::info!("new command while speaking, interrupting playback");
                self.conversation.interrupt();
                tokio::time::sleep(self.settle_delay).await;
            }

            self.set_state(LoopState::Processing);
            let routed = self.conversation.handle(&command).await;

            if !routed.should_continue {
                self.set_state(LoopState::Speaking);
                self.conversation.finish().await;
                tracing::info!("conversation ended");
                return Ok(());
            }
        }
    }
}
