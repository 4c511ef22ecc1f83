//! Speech pipeline integration tests
//!
//! A shell script stands in for the audio player: it logs the "audio" it is
//! given (the synthesized text) and then sleeps, so ordering, interruption
//! and cleanup can be observed without sound hardware.

#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use aura::SessionState;
use aura::voice::{PlayerResolver, SpeechHandle, SpeechPipeline, Synthesizer};

mod common;

use common::{FileSynth, FlakySynth, played, wait_until, write_player_script};

const POLL: Duration = Duration::from_millis(10);
const PATIENCE: Duration = Duration::from_secs(5);

fn pipeline(synth: Arc<dyn Synthesizer>, player: &Path) -> SpeechHandle {
    let resolver = PlayerResolver::exact(&[player.display().to_string()]);
    SpeechPipeline::spawn(synth, resolver, POLL)
}

async fn idle(speech: &SpeechHandle) {
    tokio::time::timeout(PATIENCE, speech.wait_idle())
        .await
        .expect("pipeline did not go idle");
}

#[tokio::test]
async fn test_utterances_play_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (player, log) = write_player_script(dir.path(), 0.0);
    let speech = pipeline(Arc::new(FileSynth::default()), &player);

    assert!(speech.enqueue("a"));
    assert!(speech.enqueue("b"));
    assert!(speech.enqueue("c"));
    idle(&speech).await;

    assert_eq!(played(&log), vec!["a", "b", "c"]);
    assert_eq!(speech.pending(), 0);
    assert!(!speech.is_playing());
    assert_eq!(speech.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_is_playing_tracks_each_utterance() {
    let dir = tempfile::tempdir().unwrap();
    let (player, log) = write_player_script(dir.path(), 0.3);
    let speech = pipeline(Arc::new(FileSynth::default()), &player);

    assert!(speech.enqueue("a"));
    assert!(speech.enqueue("b"));

    // The player logs before it sleeps, so each check lands mid-playback
    assert!(wait_until(PATIENCE, || played(&log) == ["a"]).await);
    assert!(speech.is_playing(), "not playing during the first utterance");

    assert!(wait_until(PATIENCE, || played(&log) == ["a", "b"]).await);
    assert!(speech.is_playing(), "not playing during the second utterance");

    idle(&speech).await;
    assert!(!speech.is_playing());
    assert_eq!(speech.state(), SessionState::Idle);
    assert_eq!(played(&log), vec!["a", "b"]);
}

#[tokio::test]
async fn test_text_is_cleaned_before_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let (player, log) = write_player_script(dir.path(), 0.0);
    let speech = pipeline(Arc::new(FileSynth::default()), &player);

    assert!(speech.enqueue("**Hola**   mundo 🎉"));
    idle(&speech).await;

    assert_eq!(played(&log), vec!["Hola mundo"]);
}

#[tokio::test]
async fn test_is_playing_while_player_runs() {
    let dir = tempfile::tempdir().unwrap();
    let (player, log) = write_player_script(dir.path(), 5.0);
    let speech = pipeline(Arc::new(FileSynth::default()), &player);

    assert!(speech.enqueue("largo"));
    assert!(wait_until(PATIENCE, || played(&log).len() == 1).await);
    assert!(speech.is_playing());
    assert_eq!(speech.state(), SessionState::Playing);

    speech.stop();
    idle(&speech).await;
}

#[tokio::test]
async fn test_stop_interrupts_only_the_current_utterance() {
    let dir = tempfile::tempdir().unwrap();
    let (player, log) = write_player_script(dir.path(), 5.0);
    let speech = pipeline(Arc::new(FileSynth::default()), &player);

    assert!(speech.enqueue("a"));
    assert!(speech.enqueue("b"));

    assert!(wait_until(PATIENCE, || played(&log) == ["a"]).await);
    speech.stop();
    assert!(!speech.is_playing(), "stop must clear the flag immediately");

    // The next utterance still plays
    assert!(wait_until(PATIENCE, || played(&log) == ["a", "b"]).await);
    assert!(wait_until(PATIENCE, || speech.is_playing()).await);

    speech.stop();
    idle(&speech).await;
    assert!(!speech.is_playing());
    assert_eq!(played(&log), vec!["a", "b"]);
}

#[tokio::test]
async fn test_stop_when_idle_is_harmless() {
    let dir = tempfile::tempdir().unwrap();
    let (player, log) = write_player_script(dir.path(), 0.0);
    let speech = pipeline(Arc::new(FileSynth::default()), &player);

    speech.stop();
    assert!(!speech.is_playing());

    assert!(speech.enqueue("después"));
    idle(&speech).await;
    assert_eq!(played(&log), vec!["después"]);
}

#[tokio::test]
async fn test_temp_audio_is_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let (player, log) = write_player_script(dir.path(), 0.0);
    let synth = Arc::new(FileSynth::default());
    let speech = pipeline(Arc::clone(&synth) as Arc<dyn Synthesizer>, &player);

    assert!(speech.enqueue("uno"));
    assert!(speech.enqueue("dos"));
    idle(&speech).await;

    assert_eq!(played(&log).len(), 2);
    let paths = synth.paths.lock().unwrap().clone();
    assert_eq!(paths.len(), 2);
    for path in paths {
        assert!(!path.exists(), "{} was left behind", path.display());
    }
}

#[tokio::test]
async fn test_interrupted_audio_is_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let (player, log) = write_player_script(dir.path(), 5.0);
    let synth = Arc::new(FileSynth::default());
    let speech = pipeline(Arc::clone(&synth) as Arc<dyn Synthesizer>, &player);

    assert!(speech.enqueue("cortado"));
    assert!(wait_until(PATIENCE, || played(&log).len() == 1).await);
    speech.stop();
    idle(&speech).await;

    let paths = synth.paths.lock().unwrap().clone();
    assert_eq!(paths.len(), 1);
    assert!(!paths[0].exists());
}

#[tokio::test]
async fn test_missing_player_skips_utterance() {
    let synth = Arc::new(FileSynth::default());
    let speech = SpeechPipeline::spawn(
        Arc::clone(&synth) as Arc<dyn Synthesizer>,
        PlayerResolver::exact(&["aura-no-such-player-xyz".to_string()]),
        POLL,
    );

    assert!(speech.enqueue("nadie me oye"));
    idle(&speech).await;

    assert!(!speech.is_playing());
    let paths = synth.paths.lock().unwrap().clone();
    assert_eq!(paths.len(), 1);
    assert!(!paths[0].exists());
}

#[tokio::test]
async fn test_synthesis_failure_skips_to_next() {
    let dir = tempfile::tempdir().unwrap();
    let (player, log) = write_player_script(dir.path(), 0.0);
    let speech = pipeline(Arc::new(FlakySynth::default()), &player);

    assert!(speech.enqueue("fail primero"));
    assert!(speech.enqueue("segundo"));
    idle(&speech).await;

    assert_eq!(played(&log), vec!["segundo"]);
}

#[tokio::test]
async fn test_empty_text_is_not_queued() {
    let dir = tempfile::tempdir().unwrap();
    let (player, _) = write_player_script(dir.path(), 0.0);
    let speech = pipeline(Arc::new(FileSynth::default()), &player);

    assert!(!speech.enqueue(""));
    assert!(!speech.enqueue("   "));
    assert_eq!(speech.pending(), 0);
}

#[tokio::test]
async fn test_shutdown_rejects_new_utterances() {
    let dir = tempfile::tempdir().unwrap();
    let (player, log) = write_player_script(dir.path(), 0.0);
    let speech = pipeline(Arc::new(FileSynth::default()), &player);

    assert!(speech.enqueue("última"));
    idle(&speech).await;

    tokio::time::timeout(PATIENCE, speech.shutdown())
        .await
        .expect("worker did not exit");
    assert!(!speech.enqueue("otra"));
    assert_eq!(played(&log), vec!["última"]);
}
