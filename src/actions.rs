//! Animation and sound table
//!
//! Static mapping from intent labels to what the robot does about them.
//! Labels missing from the table are treated as direct actuator commands.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Local handlers that run on the controller instead of the actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalHandler {
    /// Turn toward the speaker, resume face detection and wait for the outcome
    Identify,
}

/// What a table entry asks the dispatcher to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntentAction {
    /// Scripted gesture: each step is sent to the actuator in order
    Scripted {
        steps: Vec<String>,
        #[serde(default)]
        sound: Option<String>,
    },
    /// Runs on the controller itself (a handler is optional; sound-only entries exist)
    Internal {
        #[serde(default)]
        handler: Option<InternalHandler>,
        #[serde(default)]
        sound: Option<String>,
    },
}

impl IntentAction {
    /// Clip to play alongside the action, if any
    pub fn sound(&self) -> Option<&str> {
        match self {
            IntentAction::Scripted { sound, .. } | IntentAction::Internal { sound, .. } => {
                sound.as_deref()
            }
        }
    }
}

/// How a label resolves against the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a> {
    /// Not in the table: the label itself is the actuator token
    Direct(&'a str),
    Action(&'a IntentAction),
}

/// Intent label → action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ActionTable {
    entries: HashMap<String, IntentAction>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The robot's stock gestures
    pub fn builtin() -> Self {
        let scripted = |steps: &[&str], sound: Option<&str>| IntentAction::Scripted {
            steps: steps.iter().map(|s| s.to_string()).collect(),
            sound: sound.map(str::to_string),
        };

        let mut table = Self::new();
        table.insert(
            "raise_both_arms",
            scripted(&["R100", "L100", "R0", "L0"], Some("tada.wav")),
        );
        table.insert("how_are_you", scripted(&["R100", "L100"], None));
        table.insert("i_love_you", scripted(&["i", "k"], Some("eva.wav")));
        table.insert(
            "wave_your_hands",
            scripted(&["R100", "R70", "R100", "R70", "R0"], Some("hello_walle.wav")),
        );
        table.insert(
            "who_am_I",
            IntentAction::Internal {
                handler: None,
                sound: Some("loading_recognition.wav".to_string()),
            },
        );
        table.insert(
            "walle",
            IntentAction::Internal {
                handler: Some(InternalHandler::Identify),
                sound: None,
            },
        );
        table
    }

    pub fn insert(&mut self, label: &str, action: IntentAction) {
        self.entries.insert(label.to_string(), action);
    }

    pub fn get(&self, label: &str) -> Option<&IntentAction> {
        self.entries.get(label)
    }

    pub fn resolve<'a>(&'a self, label: &'a str) -> Resolved<'a> {
        match self.entries.get(label) {
            Some(action) => Resolved::Action(action),
            None => Resolved::Direct(label),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let table = ActionTable::builtin();
        assert_eq!(table.len(), 6);

        match table.get("wave_your_hands") {
            Some(IntentAction::Scripted { steps, sound }) => {
                assert_eq!(steps, &["R100", "R70", "R100", "R70", "R0"]);
                assert_eq!(sound.as_deref(), Some("hello_walle.wav"));
            }
            other => panic!("Expected scripted gesture, got {:?}", other),
        }

        assert_eq!(
            table.get("walle"),
            Some(&IntentAction::Internal {
                handler: Some(InternalHandler::Identify),
                sound: None,
            })
        );
    }

    #[test]
    fn test_unknown_label_is_direct() {
        let table = ActionTable::builtin();
        assert_eq!(table.resolve("w"), Resolved::Direct("w"));
        assert!(matches!(table.resolve("i_love_you"), Resolved::Action(_)));
    }

    #[test]
    fn test_table_json_shape() {
        let json = r#"{
            "nod": {"kind": "scripted", "steps": ["H10", "H0"]},
            "hum": {"kind": "internal", "sound": "hum.wav"}
        }"#;
        let table: ActionTable = serde_json::from_str(json).expect("Failed to parse table");
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("nod").and_then(|a| a.sound()), None);
        assert_eq!(table.get("hum").and_then(|a| a.sound()), Some("hum.wav"));
    }
}
