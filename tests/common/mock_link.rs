//! Mock actuator link for testing
//!
//! Records every frame written, with the time it was written.

use std::sync::{Arc, Mutex};
use std::time::Instant;
use walle::actuator::ActuatorLink;
use walle::error::{RobotError, RobotResult};

#[derive(Debug, Clone)]
pub struct SentFrame {
    pub token: String,
    pub at: Instant,
    pub delivered: bool,
}

/// Link that remembers what was written; clones share the record
#[derive(Debug, Clone)]
pub struct RecordingLink {
    frames: Arc<Mutex<Vec<SentFrame>>>,
    /// Every write fails, but is still recorded as an attempt
    fail_always: bool,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self {
            frames: Arc::new(Mutex::new(Vec::new())),
            fail_always: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_always: true,
            ..Self::new()
        }
    }

    pub fn frames(&self) -> Vec<SentFrame> {
        self.frames.lock().unwrap().clone()
    }

    /// Tokens the device actually received, newline stripped
    pub fn delivered(&self) -> Vec<String> {
        self.frames()
            .into_iter()
            .filter(|f| f.delivered)
            .map(|f| f.token)
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl Default for RecordingLink {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorLink for RecordingLink {
    fn write_frame(&mut self, frame: &[u8]) -> RobotResult<()> {
        let text = String::from_utf8_lossy(frame);
        assert!(text.ends_with('\n'), "frame must be newline terminated");
        self.frames.lock().unwrap().push(SentFrame {
            token: text.trim_end().to_string(),
            at: Instant::now(),
            delivered: !self.fail_always,
        });
        if self.fail_always {
            return Err(RobotError::Actuator("mock link unplugged".to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
