//! Shared test doubles

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempPath;

use aura::config::Keywords;
use aura::router::ActionResult;
use aura::tools::Summary;
use aura::voice::{Synthesizer, write_temp_audio};
use aura::{AppLauncher, ChatBackend, ChatError, Error, ListenOutcome, Listener, LookupError};
use aura::{ReplySink, Router, WebActions};

/// Web actions that only count and record calls
pub struct RecordingWeb {
    pub searches: AtomicUsize,
    pub videos: AtomicUsize,
    pub lookups: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
    summary: Result<Summary, LookupError>,
    browser_missing: bool,
}

impl RecordingWeb {
    pub fn new() -> Self {
        Self::with_summary(Ok(Summary {
            title: "Python".to_string(),
            extract: "Python es un lenguaje de programación.".to_string(),
            url: "https://es.wikipedia.org/wiki/Python".to_string(),
        }))
    }

    pub fn with_summary(summary: Result<Summary, LookupError>) -> Self {
        Self {
            searches: AtomicUsize::new(0),
            videos: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            summary,
            browser_missing: false,
        }
    }

    /// Web actions whose browser cannot be opened
    pub fn without_browser() -> Self {
        Self {
            browser_missing: true,
            ..Self::new()
        }
    }

    fn open(&self) -> aura::Result<()> {
        if self.browser_missing {
            return Err(Error::Launch("failed to open browser: not found".to_string()));
        }
        Ok(())
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebActions for RecordingWeb {
    async fn search_web(&self, query: &str) -> aura::Result<()> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        self.open()
    }

    async fn play_video(&self, query: &str) -> aura::Result<()> {
        self.videos.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        self.open()
    }

    async fn encyclopedia_summary(&self, query: &str) -> Result<Summary, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        self.summary.clone()
    }
}

/// Chat backend with a fixed answer
pub struct ScriptedChat {
    answer: Result<String, ChatError>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ChatError) -> Self {
        Self {
            answer: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedChat {
    async fn complete(&self, prompt: &str) -> Result<String, ChatError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer.clone()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Launcher with a fixed reply (`None` hands the command to chat)
pub struct FakeLauncher {
    reply: Option<String>,
    pub commands: Mutex<Vec<String>>,
}

impl FakeLauncher {
    pub fn replying(reply: Option<&str>) -> Self {
        Self {
            reply: reply.map(ToString::to_string),
            commands: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AppLauncher for FakeLauncher {
    async fn launch(&self, command: &str) -> Option<String> {
        self.commands.lock().unwrap().push(command.to_string());
        self.reply.clone()
    }
}

/// Router over the given doubles with default keywords
pub fn router(
    chat: Arc<ScriptedChat>,
    web: Arc<RecordingWeb>,
    launcher: Arc<FakeLauncher>,
) -> Router {
    Router::new(Keywords::default(), chat, web, launcher)
}

/// Listener that replays a script, then waits forever
pub struct ScriptedListener {
    outcomes: Mutex<VecDeque<ListenOutcome>>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl ScriptedListener {
    pub fn new(outcomes: Vec<ListenOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            delay: Duration::from_millis(5),
            calls: AtomicUsize::new(0),
        }
    }

    /// Take `delay` to "hear" each scripted outcome
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn heard(commands: &[&str]) -> Self {
        Self::new(
            commands
                .iter()
                .map(|c| ListenOutcome::Heard((*c).to_string()))
                .collect(),
        )
    }
}

#[async_trait]
impl Listener for ScriptedListener {
    async fn listen(&self) -> ListenOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(outcome) => {
                tokio::time::sleep(self.delay).await;
                outcome
            }
            None => std::future::pending().await,
        }
    }
}

/// Synthesizer that writes the text itself as the "audio" file
#[derive(Default)]
pub struct FileSynth {
    pub paths: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Synthesizer for FileSynth {
    async fn synthesize(&self, text: &str) -> aura::Result<TempPath> {
        let path = write_temp_audio(text.as_bytes()).await?;
        self.paths.lock().unwrap().push(path.to_path_buf());
        Ok(path)
    }
}

/// Synthesizer that fails for texts starting with "fail"
#[derive(Default)]
pub struct FlakySynth {
    inner: FileSynth,
}

#[async_trait]
impl Synthesizer for FlakySynth {
    async fn synthesize(&self, text: &str) -> aura::Result<TempPath> {
        if text.starts_with("fail") {
            return Err(Error::Tts("synthesis refused".to_string()));
        }
        self.inner.synthesize(text).await
    }
}

/// Sink that records everything shown
#[derive(Default)]
pub struct RecordingSink {
    pub replies: Mutex<Vec<(String, ActionResult)>>,
    pub notices: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.message.clone())
            .collect()
    }
}

impl ReplySink for RecordingSink {
    fn show(&self, command: &str, result: &ActionResult) {
        self.replies
            .lock()
            .unwrap()
            .push((command.to_string(), result.clone()));
    }

    fn notice(&self, text: &str) {
        self.notices.lock().unwrap().push(text.to_string());
    }
}

/// Write a fake audio player into `dir`
///
/// The player appends the contents of the file it is given, plus a newline,
/// to the returned log, then sleeps for `sleep_secs`.
#[cfg(unix)]
pub fn write_player_script(dir: &Path, sleep_secs: f32) -> (PathBuf, PathBuf) {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-player.sh");
    let log = dir.join("played.log");
    std::fs::write(
        &script,
        format!(
            "#!/bin/sh\ncat \"$1\" >> '{log}'\necho >> '{log}'\nexec sleep {sleep_secs}\n",
            log = log.display()
        ),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    (script, log)
}

/// Lines played so far
pub fn played(log: &Path) -> Vec<String> {
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(ToString::to_string)
        .collect()
}

/// Poll `condition` every 10 ms until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
