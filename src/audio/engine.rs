//! Sound Engine for pre-recorded clips
//!
//! Uses a channel-based architecture to handle rodio's non-Send stream.
//! The engine spawns a dedicated audio thread that owns the output device;
//! callers only enqueue a path and return immediately.

use crate::error::{RobotError, RobotResult};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use tracing::{error, info, warn};

/// Fire-and-forget clip playback
pub trait ClipPlayer: Send + Sync {
    /// Start playing `path`; must not wait for the clip to finish
    fn play(&self, path: &Path) -> RobotResult<()>;
}

/// Thread-safe handle to the sound engine
#[derive(Clone)]
pub struct SoundEngine {
    sender: mpsc::Sender<PathBuf>,
}

impl std::fmt::Debug for SoundEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundEngine").finish()
    }
}

impl SoundEngine {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel::<PathBuf>();

        thread::Builder::new()
            .name("sound-engine".to_string())
            .spawn(move || Self::audio_thread(receiver))
            .map_err(|e| warn!("🔇 Could not start audio thread: {}", e))
            .ok();

        Self { sender }
    }

    fn audio_thread(receiver: mpsc::Receiver<PathBuf>) {
        use rodio::OutputStream;

        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok(s) => s,
            Err(e) => {
                warn!("🔇 Failed to initialize audio output: {}", e);
                return;
            }
        };
        let _stream = stream;
        let mut playing: Vec<rodio::Sink> = Vec::new();

        info!("🔊 Audio thread started");

        while let Ok(path) = receiver.recv() {
            playing.retain(|sink| !sink.empty());
            // One sink per clip so overlapping clips mix instead of queueing
            match rodio::Sink::try_new(&stream_handle) {
                Ok(sink) => match Self::append_file(&sink, &path) {
                    Ok(()) => playing.push(sink),
                    Err(e) => error!("❌ Audio playback failed for {:?}: {}", path, e),
                },
                Err(e) => error!("❌ Failed to create audio sink: {}", e),
            }
        }

        info!("🔇 Audio thread stopped");
    }

    fn append_file(sink: &rodio::Sink, path: &Path) -> anyhow::Result<()> {
        use rodio::Decoder;
        use std::fs::File;
        use std::io::BufReader;

        if !path.exists() {
            anyhow::bail!("Audio file not found: {:?}", path);
        }

        let file = File::open(path)?;
        let source = Decoder::new(BufReader::new(file))?;
        sink.append(source);

        info!("🔊 Playing: {:?}", path.file_name().unwrap_or_default());
        Ok(())
    }
}

impl Default for SoundEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipPlayer for SoundEngine {
    fn play(&self, path: &Path) -> RobotResult<()> {
        self.sender
            .send(path.to_path_buf())
            .map_err(|e| RobotError::Audio(format!("Audio thread disconnected: {}", e)))
    }
}
