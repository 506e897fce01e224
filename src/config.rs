use crate::actions::ActionTable;
use crate::faces::DEFAULT_MATCH_THRESHOLD;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Names the voice classifier can answer the naming prompt with
const DEFAULT_ROSTER: &[&str] = &[
    "Almas", "Rambo", "Sula", "Amir", "Askar", "Aru", "Dias", "Ali", "Islam", "Mansur", "Marlen",
    "Amina", "Diana", "Alina", "Sofia", "Bota", "Yussuf", "Timur", "Arman", "Abay", "Lucas",
    "Leo", "Eve", "John", "Mike", "Adnan", "Michael", "Alex",
];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Actuator
    pub serial_port: String,
    pub baud_rate: u32,
    pub serial_boot_delay_ms: u64,
    pub stop_token: String,

    // Timing
    pub settle_delay_ms: u64,
    pub step_delay_ms: u64,
    pub idle_poll_ms: u64,
    pub no_face_sleep_ms: u64,
    pub naming_timeout_secs: u64,
    pub identify_timeout_secs: u64,

    // Recognition
    pub match_threshold: f32,
    pub face_replay_path: Option<String>,
    pub known_names: Vec<String>,

    // Speech
    pub vosk_model_path: String,
    pub intent_phrases: HashMap<String, String>,
    pub speech_output: String,

    // Actions
    pub assets_dir: String,
    pub actions: ActionTable,

    // Meta
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            serial_boot_delay_ms: 2000,
            stop_token: "q".to_string(),
            settle_delay_ms: 2000,
            step_delay_ms: 1000,
            idle_poll_ms: 10,
            no_face_sleep_ms: 100,
            naming_timeout_secs: 30,
            identify_timeout_secs: 10,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            face_replay_path: None,
            known_names: DEFAULT_ROSTER.iter().map(|n| n.to_string()).collect(),
            vosk_model_path: dirs::data_dir()
                .unwrap_or_default()
                .join("walle/models/vosk-model-small-en-us")
                .to_string_lossy()
                .to_string(),
            intent_phrases: HashMap::from([
                ("raise both arms".to_string(), "raise_both_arms".to_string()),
                ("how are you".to_string(), "how_are_you".to_string()),
                ("i love you".to_string(), "i_love_you".to_string()),
                ("wave your hands".to_string(), "wave_your_hands".to_string()),
                ("who am i".to_string(), "who_am_I".to_string()),
                ("walle".to_string(), "walle".to_string()),
                ("go forward".to_string(), "w".to_string()),
                ("go back".to_string(), "s".to_string()),
                ("turn left".to_string(), "a".to_string()),
                ("turn right".to_string(), "d".to_string()),
            ]),
            speech_output: "system".to_string(),
            assets_dir: "./assets".to_string(),
            actions: ActionTable::builtin(),
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, or create default
    pub fn load() -> Result<Self> {
        Self::load_or_init(&config_path())
    }

    /// Like `load_from`, but writes the defaults out when no file exists yet
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from(path);
        }

        let config = Self::default();
        match config.save_to(path) {
            Ok(()) => tracing::info!("📝 Wrote default config to {}", path.display()),
            Err(e) => tracing::warn!("⚠️ Could not write default config to {}: {}", path.display(), e),
        }
        Ok(config)
    }

    /// Load config from a file; a corrupt file is set aside and defaults are used
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                let backup_path = path.with_extension("json.corrupt");
                if let Err(e) = std::fs::rename(path, &backup_path) {
                    tracing::warn!(
                        "⚠️ Could not back up corrupt config to {}: {}",
                        backup_path.display(),
                        e
                    );
                }
                Ok(Self::default())
            }
        }
    }

    /// Save config to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn no_face_sleep(&self) -> Duration {
        Duration::from_millis(self.no_face_sleep_ms)
    }

    pub fn naming_timeout(&self) -> Duration {
        Duration::from_secs(self.naming_timeout_secs)
    }

    pub fn identify_timeout(&self) -> Duration {
        Duration::from_secs(self.identify_timeout_secs)
    }

    pub fn serial_boot_delay(&self) -> Duration {
        Duration::from_millis(self.serial_boot_delay_ms)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("walle")
        .join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.serial_port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.match_threshold, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(config.settle_delay(), Duration::from_secs(2));
        assert_eq!(config.step_delay(), Duration::from_secs(1));
        assert_eq!(config.naming_timeout(), Duration::from_secs(30));
        assert!(config.known_names.iter().any(|n| n == "Rambo"));
    }

    #[test]
    fn test_config_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"serial_port": "/dev/ttyACM0", "step_delay_ms": 250}"#)
            .expect("Failed to write config");

        let config = Config::load_from(&path).expect("Failed to load config");
        assert_eq!(config.serial_port, "/dev/ttyACM0");
        assert_eq!(config.step_delay_ms, 250);
        assert_eq!(config.stop_token, "q");
        assert_eq!(config.actions.len(), ActionTable::builtin().len());
    }

    #[test]
    fn test_config_corrupt_file_is_backed_up() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not valid json").expect("Failed to write config");

        let config = Config::load_from(&path).expect("Corrupt config should degrade");
        assert_eq!(config.serial_port, "/dev/ttyUSB0");
        assert!(!path.exists());
        assert!(dir.path().join("config.json.corrupt").exists());
    }

    #[test]
    fn test_missing_config_is_written_out() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("walle").join("config.json");

        let config = Config::load_or_init(&path).expect("Failed to init config");
        assert_eq!(config.serial_port, "/dev/ttyUSB0");
        assert!(path.exists());

        let reloaded = Config::load_or_init(&path).expect("Failed to reload config");
        assert_eq!(reloaded.known_names, config.known_names);
        assert_eq!(reloaded.actions.len(), config.actions.len());
    }

    #[test]
    fn test_config_save_and_reload() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.known_names = vec!["Sultan".to_string()];
        config.save_to(&path).expect("Failed to save config");

        let restored = Config::load_from(&path).expect("Failed to reload config");
        assert_eq!(restored.known_names, vec!["Sultan".to_string()]);
    }
}
