//! Wall-E - voice-driven robot controller
//!
//! Wires the microphone, face recognizer, intent dispatcher and actuator link
//! together and runs until Ctrl-C or `quit`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walle::actuator::CommandChannel;
use walle::audio::{self, ClipPlayer, SoundEngine};
use walle::config::Config;
use walle::dispatcher::{DispatchSettings, IntentDispatcher};
use walle::exchange::exchange;
use walle::faces::FaceDatabase;
use walle::fsm::{FaceRecognizer, RecognizerSettings};
use walle::orient::{self, Orienter};
use walle::shutdown::StopSignal;
use walle::speech::{self, Speaker};
use walle::vision;
use walle::voice::{VoicePump, VoskIntentEngine};

/// Pace of the replay camera
const REPLAY_FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print audio devices and exit
    #[arg(long)]
    list_devices: bool,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Listen for spoken commands
    Voice {
        /// Audio input device index
        #[arg(short, long)]
        device: Option<usize>,
    },
    /// Type commands on stdin
    Manual,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        return list_devices();
    }

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let level = if args.verbose {
        "debug".to_string()
    } else {
        config.log_level.to_lowercase()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    info!("🤖 Wall-E v{} starting...", env!("CARGO_PKG_VERSION"));

    let stop = StopSignal::new();
    let channel = Arc::new(CommandChannel::open(&config));
    info!("Actuator link: {}", channel.link_name());
    let orienter = Orienter::new(orient::create_direction_source(), &config.stop_token);
    let speaker: Arc<dyn Speaker> = Arc::from(speech::create_speaker(&config.speech_output));
    let player: Arc<dyn ClipPlayer> = Arc::new(SoundEngine::new());
    let (recognizer_end, dispatcher_end) = exchange();

    let recognizer = FaceRecognizer::new(
        vision::create_source(config.face_replay_path.as_deref(), REPLAY_FRAME_INTERVAL),
        FaceDatabase::new(),
        recognizer_end,
        speaker.clone(),
        RecognizerSettings::from(&config),
        stop.clone(),
    );
    let handle = recognizer.handle();
    let recognizer_thread = recognizer
        .spawn()
        .context("Failed to start face recognizer")?;

    let (intents_tx, intents_rx) = crossbeam_channel::unbounded();
    let dispatcher = IntentDispatcher::new(
        channel.clone(),
        player,
        speaker,
        handle,
        dispatcher_end,
        orienter.clone(),
        config.actions.clone(),
        &config.known_names,
        DispatchSettings::from(&config),
    );
    let dispatcher_thread = dispatcher
        .spawn(intents_rx, stop.clone())
        .context("Failed to start intent dispatcher")?;

    let mut workers: Vec<JoinHandle<()>> = vec![recognizer_thread, dispatcher_thread];
    // Keeps the microphone stream alive for the whole run
    let mut _capture = None;

    match args.mode.unwrap_or(Mode::Voice { device: None }) {
        Mode::Voice { device } => {
            let engine = VoskIntentEngine::new(&config)?;
            let (capture, frames) = audio::start_capture(device)?;
            println!("Using input device: {}", capture.device_name);
            _capture = Some(capture);

            let pump = VoicePump::new(Box::new(engine), intents_tx, stop.clone());
            workers.push(pump.spawn(frames).context("Failed to start voice pump")?);
            println!("Listening…  Ctrl-C to stop");
        }
        Mode::Manual => {
            drop(intents_tx);
            let manual_stop = stop.clone();
            // Not joined: a blocked stdin read must not hold up shutdown
            std::thread::Builder::new()
                .name("manual-input".to_string())
                .spawn(move || {
                    manual_loop(&channel, &orienter);
                    manual_stop.stop();
                })
                .context("Failed to start manual input")?;
        }
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if result.is_ok() {
                info!("received Ctrl+C, shutting down...");
            }
        }
        _ = wait_for_stop(stop.clone()) => {}
    }

    stop.stop();
    drop(_capture);
    for worker in workers {
        if worker.join().is_err() {
            warn!("A worker thread panicked");
        }
    }

    println!("Bye!");
    Ok(())
}

async fn wait_for_stop(stop: StopSignal) {
    while !stop.is_set() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Typed commands: `quit` exits, `r` turns toward the speaker, anything else
/// sends its first character
fn manual_loop(channel: &CommandChannel, orienter: &Orienter) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let cmd = line.trim();
        match cmd {
            "quit" => break,
            "r" => {
                orienter.face_speaker(channel);
            }
            _ => {
                if let Some(first) = cmd.chars().next() {
                    channel.send_or_warn(&first.to_string());
                }
            }
        }
    }
}

fn list_devices() -> Result<()> {
    println!("\nAudio devices:");
    for device in audio::devices()? {
        println!("  {}", device);
    }
    println!();
    Ok(())
}
