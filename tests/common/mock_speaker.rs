//! Mock speaker: records what was said and prompted

use std::sync::{Arc, Mutex};
use walle::error::{RobotError, RobotResult};
use walle::speech::Speaker;

#[derive(Debug, Clone, Default)]
pub struct RecordingSpeaker {
    pub said: Arc<Mutex<Vec<String>>>,
    pub prompts: Arc<Mutex<Vec<String>>>,
    no_display: bool,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every prompt is recorded, then fails
    pub fn without_display() -> Self {
        Self {
            no_display: true,
            ..Self::default()
        }
    }

    pub fn said(&self) -> Vec<String> {
        self.said.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn was_prompted(&self, text: &str) -> bool {
        self.prompts.lock().unwrap().iter().any(|p| p == text)
    }
}

impl Speaker for RecordingSpeaker {
    fn say(&self, text: &str) -> RobotResult<()> {
        self.said.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn prompt(&self, text: &str) -> RobotResult<()> {
        self.prompts.lock().unwrap().push(text.to_string());
        if self.no_display {
            return Err(RobotError::Audio("no display".to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
