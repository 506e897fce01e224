//! Face identity table
//!
//! Maps a person's name to every embedding remembered for them and answers
//! "who is this?" by nearest squared Euclidean distance.

use crate::error::RobotResult;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Fixed-length face embedding produced by the vision pipeline
pub type Embedding = Vec<f32>;

/// Default maximum squared distance accepted as a match
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.50;

/// Everything remembered about one person
#[derive(Debug, Clone, PartialEq)]
pub struct PersonRecord {
    pub name: String,
    pub embeddings: Vec<Embedding>,
}

/// Result of comparing one embedding against the table
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    Known { name: String, distance: f32 },
    Unknown { best_distance: f32 },
}

impl Recognition {
    pub fn name(&self) -> Option<&str> {
        match self {
            Recognition::Known { name, .. } => Some(name.as_str()),
            Recognition::Unknown { .. } => None,
        }
    }
}

/// Sum of squared component differences; symmetric in its arguments.
/// Embeddings of different dimension never match.
pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Shared handle to the name → record table
///
/// Only the recognizer thread writes; anyone may read.
#[derive(Debug, Clone, Default)]
pub struct FaceDatabase {
    people: Arc<RwLock<HashMap<String, PersonRecord>>>,
}

impl FaceDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an embedding for `name`, creating the record on first sight
    pub fn remember(&self, name: &str, embedding: Embedding) -> RobotResult<usize> {
        let mut people = self.people.write()?;
        let record = people
            .entry(name.to_string())
            .or_insert_with(|| PersonRecord {
                name: name.to_string(),
                embeddings: Vec::new(),
            });
        record.embeddings.push(embedding);
        Ok(record.embeddings.len())
    }

    /// Global nearest neighbour over every stored embedding
    pub fn recognize(&self, embedding: &[f32], threshold: f32) -> RobotResult<Recognition> {
        let people = self.people.read()?;

        let mut best = f32::INFINITY;
        let mut who: Option<&str> = None;
        for record in people.values() {
            for stored in &record.embeddings {
                let d = squared_distance(embedding, stored);
                if d < best {
                    best = d;
                    who = Some(&record.name);
                }
            }
        }

        Ok(match who {
            Some(name) if best <= threshold => Recognition::Known {
                name: name.to_string(),
                distance: best,
            },
            _ => Recognition::Unknown {
                best_distance: best,
            },
        })
    }

    pub fn get(&self, name: &str) -> RobotResult<Option<PersonRecord>> {
        Ok(self.people.read()?.get(name).cloned())
    }

    pub fn len(&self) -> usize {
        self.people.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
