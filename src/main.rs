use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use aura::agent::{self, ChatBackend, OpenRouterChat};
use aura::tools::{DesktopLauncher, DesktopWeb, system};
use aura::voice::{self, AudioCapture, ListenOutcome, Listener, MicrophoneListener, SpeechHandle};
use aura::{Config, ConsoleSink, Conversation, ListenLoop, Router};

const GREETING: &str = "Hola, soy Aura. Sistema iniciado en modo terminal.";

/// Aura - Spanish-speaking voice and chat assistant
#[derive(Parser)]
#[command(name = "aura", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file to use instead of ~/.config/aura/config.toml
    #[arg(short, long, env = "AURA_CONFIG")]
    config: Option<PathBuf>,

    /// Show replies without speaking them
    #[arg(long, env = "AURA_NO_SPEECH")]
    no_speech: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Type commands in the terminal
    Chat,
    /// Listen on the microphone until you say goodbye
    Listen,
    /// Route a single command and print the reply
    Ask {
        /// Command text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Speak a sentence
    Say {
        /// Text to speak
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Run the system self-test
    Check,
    /// List detected applications
    Apps {
        /// Only show names containing this text
        filter: Option<String>,
    },
    /// Set the master volume
    Volume {
        /// Percent, 0-100
        percent: u8,
    },
    /// Permanently empty the trash
    EmptyTrash {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Move a file to the trash
    Trash {
        /// File to move
        path: PathBuf,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Interactive first-run setup
    Setup,
}

impl Command {
    /// Whether the command produces spoken output
    const fn speaks(&self) -> bool {
        matches!(
            self,
            Self::Chat | Self::Listen | Self::Ask { .. } | Self::Say { .. } | Self::Check
        )
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), cli.verbose))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Log filter from `RUST_LOG` when set and valid, else from the verbosity count
fn log_filter(rust_log: Option<&str>, verbose: u8) -> EnvFilter {
    let default = match verbose {
        0 => "info,aura=info",
        1 => "info,aura=debug",
        2 => "debug",
        _ => "trace",
    };

    rust_log
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    let config = Config::load_from(config_path);
    tracing::debug!(
        model = %config.chat.model,
        stt = ?config.listen.stt_provider,
        tts = ?config.speech.tts_provider,
        "loaded configuration"
    );

    let speech = if cli.command.speaks() && !cli.no_speech {
        start_speech(&config)
    } else {
        None
    };

    let result = match cli.command {
        Command::Chat => chat_mode(&config, speech.clone()).await,
        Command::Listen => listen_mode(&config, speech.clone()).await,
        Command::Ask { text } => ask(&config, speech.clone(), &text.join(" ")).await,
        Command::Say { text } => say(speech.as_ref(), &text.join(" ")).await,
        Command::Check => check(&config, speech.clone()).await,
        Command::Apps { filter } => {
            list_apps(&config, filter.as_deref());
            Ok(())
        }
        Command::Volume { percent } => {
            let percent = system::set_volume(percent).await?;
            println!("Volumen ajustado al {percent}%.");
            Ok(())
        }
        Command::EmptyTrash { yes } => empty_trash(yes).await,
        Command::Trash { path, yes } => trash(&path, yes).await,
        Command::TestMic { duration } => test_mic(duration).await,
        Command::Setup => aura::setup::run_setup(config_path),
    };

    if let Some(speech) = &speech {
        speech.shutdown().await;
    }
    result
}

/// Start the speech pipeline, continuing without speech when it is not configured
fn start_speech(config: &Config) -> Option<SpeechHandle> {
    match voice::speech_from_config(config) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "speech output unavailable, replies will only be shown");
            None
        }
    }
}

fn build_conversation(
    config: &Config,
    speech: Option<SpeechHandle>,
) -> (Conversation, Arc<OpenRouterChat>) {
    let chat = Arc::new(OpenRouterChat::new(
        config.api_keys.openrouter.clone(),
        config.chat.clone(),
    ));
    if !chat.is_configured() {
        tracing::warn!("OPENROUTER_API_KEY not set, chat replies will be unavailable");
    }

    let web = Arc::new(DesktopWeb::new(&config.language.encyclopedia));
    let launcher = Arc::new(DesktopLauncher::new(&config.launcher, &config.keywords));
    let router = Router::new(config.keywords.clone(), chat.clone(), web, launcher);

    (
        Conversation::new(router, speech, Arc::new(ConsoleSink)),
        chat,
    )
}

/// Interactive text loop
async fn chat_mode(config: &Config, speech: Option<SpeechHandle>) -> anyhow::Result<()> {
    let (conversation, _) = build_conversation(config, speech);
    conversation.announce(GREETING);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let routed = conversation.handle(line).await;
        if !routed.should_continue {
            break;
        }
    }

    conversation.finish().await;
    Ok(())
}

/// Continuous voice loop until goodbye or Ctrl+C
async fn listen_mode(config: &Config, speech: Option<SpeechHandle>) -> anyhow::Result<()> {
    let listener = Arc::new(MicrophoneListener::from_config(config)?);
    let (conversation, _) = build_conversation(config, speech);
    conversation.announce("Hola, soy Aura. Te escucho.");

    let listen_loop = ListenLoop::new(conversation, listener, &config.listen);

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    listen_loop.run(&mut shutdown_rx).await?;
    Ok(())
}

async fn ask(config: &Config, speech: Option<SpeechHandle>, text: &str) -> anyhow::Result<()> {
    let (conversation, _) = build_conversation(config, speech);
    conversation.handle(text).await;
    conversation.finish().await;
    Ok(())
}

async fn say(speech: Option<&SpeechHandle>, text: &str) -> anyhow::Result<()> {
    let Some(speech) = speech else {
        anyhow::bail!("speech output is not available");
    };
    if !speech.enqueue(text) {
        anyhow::bail!("nothing to say");
    }
    speech.wait_idle().await;
    Ok(())
}

/// System self-test
async fn check(config: &Config, speech: Option<SpeechHandle>) -> anyhow::Result<()> {
    println!("{}", "=".repeat(60));
    println!("TEST DE SISTEMA");
    println!("{}", "=".repeat(60));

    println!("\n1. Síntesis de voz...");
    match &speech {
        Some(speech) => {
            if speech.enqueue("Probando sistema de voz") {
                speech.wait_idle().await;
                println!("   completado");
            }
        }
        None => println!("   salida de voz no disponible"),
    }

    println!("\n2. Reconocimiento de voz (di algo)...");
    match MicrophoneListener::from_config(config) {
        Ok(listener) => match listener.listen().await {
            ListenOutcome::Heard(text) => println!("   reconocido: {text}"),
            ListenOutcome::NoSpeech => println!("   no se detectó voz"),
            ListenOutcome::Failed(reason) => println!("   error: {reason}"),
        },
        Err(e) => println!("   no disponible: {e}"),
    }

    let (conversation, chat) = build_conversation(config, speech);

    println!("\n3. Conexión con {}...", chat.name());
    if agent::verify(chat.as_ref()).await {
        println!("   modelo {} responde", chat.model());
    } else {
        println!("   sin respuesta del modelo");
    }

    for (step, command) in [
        (4, "hola"),
        (5, "busca en google python"),
        (6, "busca en youtube música"),
        (7, "busca en wikipedia python"),
    ] {
        println!("\n{step}. Procesando '{command}'...");
        let routed = conversation.handle(command).await;
        println!("   [{}]", routed.result.kind);
    }

    conversation.finish().await;
    println!("\n{}", "=".repeat(60));
    println!("Tests completados");
    println!("{}", "=".repeat(60));
    Ok(())
}

fn list_apps(config: &Config, filter: Option<&str>) {
    let launcher = DesktopLauncher::new(&config.launcher, &config.keywords);
    let programs = launcher.programs();
    let filter = filter.map(str::to_lowercase);

    let mut shown = 0_usize;
    for (name, command) in programs.iter() {
        if filter.as_deref().is_none_or(|f| name.contains(f)) {
            println!("{name:<30} {command}");
            shown += 1;
        }
    }
    println!("\n{shown} de {} aplicaciones", programs.len());
}

async fn empty_trash(yes: bool) -> anyhow::Result<()> {
    let confirmed = yes
        || Confirm::new()
            .with_prompt(
                "¿Estás totalmente seguro de que quieres vaciar la papelera? Esta acción es irreversible.",
            )
            .default(false)
            .interact()?;

    if !confirmed {
        println!("Operación cancelada.");
        return Ok(());
    }

    system::empty_trash().await?;
    println!("Papelera vaciada.");
    Ok(())
}

async fn trash(path: &Path, yes: bool) -> anyhow::Result<()> {
    let confirmed = yes
        || Confirm::new()
            .with_prompt(format!(
                "Esta acción enviará '{}' a la papelera. ¿Estás seguro?",
                path.display()
            ))
            .default(false)
            .interact()?;

    if !confirmed {
        println!("Operación cancelada.");
        return Ok(());
    }

    system::move_to_trash(path).await?;
    println!("'{}' enviado a la papelera.", path.display());
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Probando el micrófono durante {duration} segundos...");
    println!("¡Habla al micrófono!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Frecuencia de muestreo: {} Hz", voice::SAMPLE_RATE);
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = voice::calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Pico: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("Si el medidor se movió, el micrófono funciona.");
    println!("La voz debe superar listen.energy_threshold para ser escuchada.");
    println!("Si el RMS se quedó cerca de 0, revisa:");
    println!("  1. Que el micrófono esté conectado");
    println!("  2. La fuente por defecto: pactl info | grep 'Default Source'");
    println!("  3. Los dispositivos disponibles: arecord -l");

    Ok(())
}
