//! Spoken acknowledgements and on-screen prompts

use crate::error::{RobotError, RobotResult};
use std::process::{Command, ExitStatus};
use std::thread;
use tracing::{debug, info};

/// Output side of the conversation
pub trait Speaker: Send + Sync {
    /// Say something out loud
    fn say(&self, text: &str) -> RobotResult<()>;

    /// Show a short prompt to the person in front of the robot
    fn prompt(&self, text: &str) -> RobotResult<()> {
        info!("[PROMPT] {}", text);
        Ok(())
    }

    /// Engine name
    fn name(&self) -> &str;
}

/// Speech through whatever synthesizer the system has
#[derive(Debug, Default)]
pub struct SystemSpeaker;

impl SystemSpeaker {
    pub fn new() -> Self {
        Self
    }
}

impl Speaker for SystemSpeaker {
    fn say(&self, text: &str) -> RobotResult<()> {
        debug!("System speaking: {}", text);

        // Try spd-say (speech-dispatcher) or espeak-ng
        if spawn_reaped("spd-say", text).is_ok() {
            return Ok(());
        }

        if spawn_reaped("espeak-ng", text).is_ok() {
            return Ok(());
        }

        Err(RobotError::Audio(
            "No system TTS command found (tried spd-say, espeak-ng)".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "system"
    }
}

/// Start `program text` without waiting for it; a detached thread reaps the child
fn spawn_reaped(
    program: &str,
    text: &str,
) -> std::io::Result<thread::JoinHandle<Option<ExitStatus>>> {
    let mut child = Command::new(program).arg(text).spawn()?;
    let program = program.to_string();
    thread::Builder::new()
        .name("tts-reaper".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => {
                debug!("{} exited with {}", program, status);
                Some(status)
            }
            Err(e) => {
                debug!("Could not wait for {}: {}", program, e);
                None
            }
        })
}

/// Writes speech to the log only
#[derive(Debug, Default)]
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
    fn say(&self, text: &str) -> RobotResult<()> {
        info!("[SAY] {}", text);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Pick the configured speech output
pub fn create_speaker(kind: &str) -> Box<dyn Speaker> {
    match kind {
        "log" | "none" => Box::new(LogSpeaker),
        _ => Box::new(SystemSpeaker::new()),
    }
}
