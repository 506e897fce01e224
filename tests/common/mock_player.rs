//! Mock clip player: records requested clips instead of playing them

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use walle::audio::ClipPlayer;
use walle::error::RobotResult;

#[derive(Debug, Clone, Default)]
pub struct RecordingPlayer {
    pub played: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<PathBuf> {
        self.played.lock().unwrap().clone()
    }
}

impl ClipPlayer for RecordingPlayer {
    fn play(&self, path: &Path) -> RobotResult<()> {
        self.played.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
