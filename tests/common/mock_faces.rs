//! Mock camera: shows whatever the test puts in front of it

use std::sync::{Arc, Mutex};
use walle::faces::Embedding;
use walle::vision::{FaceSample, FaceSource};

#[derive(Debug, Clone)]
pub struct ScriptedFaceSource {
    current: Arc<Mutex<FaceSample>>,
    samples: Arc<Mutex<usize>>,
}

impl ScriptedFaceSource {
    pub fn empty() -> Self {
        Self {
            current: Arc::new(Mutex::new(FaceSample::Nothing)),
            samples: Arc::new(Mutex::new(0)),
        }
    }

    pub fn showing(embedding: Embedding) -> Self {
        let source = Self::empty();
        source.show(embedding);
        source
    }

    pub fn show(&self, embedding: Embedding) {
        *self.current.lock().unwrap() = FaceSample::Face(embedding);
    }

    pub fn clear(&self) {
        *self.current.lock().unwrap() = FaceSample::Nothing;
    }

    pub fn samples(&self) -> usize {
        *self.samples.lock().unwrap()
    }
}

impl FaceSource for ScriptedFaceSource {
    fn sample(&mut self) -> FaceSample {
        *self.samples.lock().unwrap() += 1;
        self.current.lock().unwrap().clone()
    }
}
