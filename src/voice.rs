//! Voice intent adapter
//!
//! Turns microphone frames into intent labels. Recognition is restricted to a
//! grammar made of the configured phrases and the known names, so every
//! finalized utterance either maps to a label or is reported as not understood.

use crate::audio::SAMPLE_RATE;
use crate::config::Config;
use crate::shutdown::StopSignal;
use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use vosk::{Model, Recognizer};

const FRAME_POLL: Duration = Duration::from_millis(100);

/// One recognized utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentEvent {
    pub label: String,
    pub understood: bool,
}

impl IntentEvent {
    pub fn understood(label: &str) -> Self {
        Self {
            label: label.to_string(),
            understood: true,
        }
    }

    pub fn not_understood() -> Self {
        Self {
            label: String::new(),
            understood: false,
        }
    }
}

/// Consumes 16 kHz mono frames and reports finalized utterances
pub trait IntentEngine: Send {
    fn process(&mut self, frame: &[i16]) -> Result<Option<IntentEvent>>;
}

/// Spoken phrase → intent label
#[derive(Debug, Clone, Default)]
pub struct PhraseMap {
    phrases: HashMap<String, String>,
}

impl PhraseMap {
    /// Configured phrases plus one entry per known name, keyed in lowercase
    pub fn from_config(config: &Config) -> Self {
        let mut phrases: HashMap<String, String> = config
            .intent_phrases
            .iter()
            .map(|(phrase, label)| (normalize(phrase), label.clone()))
            .collect();

        for name in &config.known_names {
            phrases
                .entry(normalize(name))
                .or_insert_with(|| name.clone());
        }

        Self { phrases }
    }

    /// Map finalized text to an event; unmapped text is not understood
    pub fn lookup(&self, text: &str) -> IntentEvent {
        match self.phrases.get(&normalize(text)) {
            Some(label) => IntentEvent::understood(label),
            None => IntentEvent::not_understood(),
        }
    }

    /// Recognizer grammar, with `[unk]` so stray speech is not forced onto a phrase
    pub fn grammar(&self) -> Vec<String> {
        let mut grammar: Vec<String> = self.phrases.keys().cloned().collect();
        grammar.sort();
        grammar.push("[unk]".to_string());
        grammar
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Offline recognition with Vosk
pub struct VoskIntentEngine {
    recognizer: Recognizer,
    phrases: PhraseMap,
}

impl VoskIntentEngine {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = std::path::PathBuf::from(&config.vosk_model_path);
        if !model_path.exists() {
            return Err(anyhow::anyhow!(
                "Vosk model not found at {}",
                model_path.display()
            ));
        }

        info!("Loading Vosk model from: {}", model_path.display());
        let model_str = model_path.to_str().ok_or_else(|| {
            anyhow::anyhow!(
                "Vosk model path is not valid UTF-8: {}",
                model_path.display()
            )
        })?;
        let model = Model::new(model_str).context("Failed to load Vosk model")?;

        let phrases = PhraseMap::from_config(config);
        let grammar = phrases.grammar();
        info!("⚙️ Intent grammar has {} phrases", grammar.len());
        let recognizer = Recognizer::new_with_grammar(&model, SAMPLE_RATE as f32, &grammar)
            .context("Failed to create Vosk recognizer with grammar")?;

        Ok(Self {
            recognizer,
            phrases,
        })
    }
}

impl IntentEngine for VoskIntentEngine {
    fn process(&mut self, frame: &[i16]) -> Result<Option<IntentEvent>> {
        match self.recognizer.accept_waveform(frame) {
            vosk::DecodingState::Finalized => {
                let result = self.recognizer.final_result();
                let Some(single) = result.single() else {
                    return Ok(None);
                };
                let text = single.text.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                debug!("Heard: '{}'", text);
                Ok(Some(self.phrases.lookup(text)))
            }
            vosk::DecodingState::Running => Ok(None),
            vosk::DecodingState::Failed => {
                debug!("Decoding failed for this chunk");
                Ok(None)
            }
        }
    }
}

/// Feeds captured audio to an engine and forwards understood intents
pub struct VoicePump {
    engine: Box<dyn IntentEngine>,
    intents: Sender<IntentEvent>,
    stop: StopSignal,
}

impl VoicePump {
    pub fn new(engine: Box<dyn IntentEngine>, intents: Sender<IntentEvent>, stop: StopSignal) -> Self {
        Self {
            engine,
            intents,
            stop,
        }
    }

    /// Run until stopped, the capture ends or the dispatcher goes away
    pub fn run(mut self, frames: Receiver<Vec<i16>>) {
        info!("🎤 Listening for intents");
        while !self.stop.is_set() {
            let frame = match frames.recv_timeout(FRAME_POLL) {
                Ok(frame) => frame,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Audio capture ended");
                    break;
                }
            };

            match self.engine.process(&frame) {
                Ok(Some(event)) if event.understood => {
                    info!("🗣️ Intent: {}", event.label);
                    if self.intents.send(event).is_err() {
                        break;
                    }
                }
                Ok(Some(_)) => info!("Command not understood."),
                Ok(None) => {}
                Err(e) => warn!("Intent engine error: {:#}", e),
            }
        }
        info!("🎤 Voice pump stopped");
    }

    pub fn spawn(self, frames: Receiver<Vec<i16>>) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("voice-pump".to_string())
            .spawn(move || self.run(frames))
    }
}
