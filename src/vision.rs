//! Vision adapter
//!
//! The detector and embedding networks live outside this crate. The face
//! recognizer only asks a [`FaceSource`] for the current frame's sample.

use crate::faces::Embedding;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// One camera frame's worth of perception
#[derive(Debug, Clone, PartialEq)]
pub enum FaceSample {
    /// A face passed the detection threshold and was embedded
    Face(Embedding),
    /// No face of sufficient confidence in this frame
    Nothing,
}

impl From<Option<Embedding>> for FaceSample {
    fn from(value: Option<Embedding>) -> Self {
        match value {
            Some(e) => FaceSample::Face(e),
            None => FaceSample::Nothing,
        }
    }
}

/// Produces one sample per request; should not block longer than one frame
pub trait FaceSource: Send {
    fn sample(&mut self) -> FaceSample;
}

/// Camera missing: every frame is empty
#[derive(Debug, Default)]
pub struct NoCamera {
    warned: bool,
}

impl FaceSource for NoCamera {
    fn sample(&mut self) -> FaceSample {
        if !self.warned {
            warn!("⚠️ No camera available, face recognition is idle");
            self.warned = true;
        }
        FaceSample::Nothing
    }
}

/// Replays recorded embeddings, one JSON value per line (`null` = no face)
#[derive(Debug)]
pub struct ReplayFaceSource {
    frames: Vec<Option<Embedding>>,
    cursor: usize,
    frame_interval: Duration,
}

impl ReplayFaceSource {
    pub fn new(frames: Vec<Option<Embedding>>, frame_interval: Duration) -> Self {
        Self {
            frames,
            cursor: 0,
            frame_interval,
        }
    }

    pub fn load(path: &Path, frame_interval: Duration) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read face replay {}", path.display()))?;

        let mut frames = Vec::new();
        let mut dimension: Option<usize> = None;
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let frame: Option<Embedding> = serde_json::from_str(line)
                .with_context(|| format!("{}:{}: bad embedding", path.display(), lineno + 1))?;
            if let Some(embedding) = &frame {
                let expected = *dimension.get_or_insert(embedding.len());
                if embedding.len() != expected {
                    anyhow::bail!(
                        "{}:{}: embedding has {} values, expected {}",
                        path.display(),
                        lineno + 1,
                        embedding.len(),
                        expected
                    );
                }
            }
            frames.push(frame);
        }

        info!("🎞️ Loaded {} replay frames from {}", frames.len(), path.display());
        Ok(Self::new(frames, frame_interval))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FaceSource for ReplayFaceSource {
    fn sample(&mut self) -> FaceSample {
        if !self.frame_interval.is_zero() {
            std::thread::sleep(self.frame_interval);
        }
        if self.frames.is_empty() {
            return FaceSample::Nothing;
        }
        let frame = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        frame.into()
    }
}

/// Replay file if configured and readable, otherwise the empty camera
pub fn create_source(replay_path: Option<&str>, frame_interval: Duration) -> Box<dyn FaceSource> {
    match replay_path {
        Some(path) => match ReplayFaceSource::load(Path::new(path), frame_interval) {
            Ok(source) => Box::new(source),
            Err(e) => {
                warn!("⚠️ {:#}", e);
                Box::new(NoCamera::default())
            }
        },
        None => Box::new(NoCamera::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_cycles() {
        let mut source = ReplayFaceSource::new(
            vec![Some(vec![0.1, 0.2]), None],
            Duration::ZERO,
        );
        assert_eq!(source.sample(), FaceSample::Face(vec![0.1, 0.2]));
        assert_eq!(source.sample(), FaceSample::Nothing);
        assert_eq!(source.sample(), FaceSample::Face(vec![0.1, 0.2]));
    }

    #[test]
    fn test_replay_file_parsing() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("faces.jsonl");
        std::fs::write(&path, "# recorded session\n[0.5, 0.25]\nnull\n\n[1.0, 0.0]\n")
            .expect("Failed to write replay");

        let source = ReplayFaceSource::load(&path, Duration::ZERO).expect("Failed to load");
        assert_eq!(source.len(), 3);
    }

    #[test]
    fn test_replay_rejects_mixed_dimensions() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("faces.jsonl");
        std::fs::write(&path, "[0.1, 0.2, 9.0, 9.0]\nnull\n[0.1, 0.2]\n")
            .expect("Failed to write replay");

        let err = ReplayFaceSource::load(&path, Duration::ZERO).unwrap_err();
        assert!(err.to_string().contains(":3:"), "unexpected error: {}", err);
    }

    #[test]
    fn test_bad_replay_falls_back_to_no_camera() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("faces.jsonl");
        std::fs::write(&path, "[0.5, oops]\n").expect("Failed to write replay");

        let mut source = create_source(path.to_str(), Duration::ZERO);
        assert_eq!(source.sample(), FaceSample::Nothing);
    }
}
