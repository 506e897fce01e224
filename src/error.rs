//! Walle Error Types
//!
//! Centralized error handling for the control layer.

use thiserror::Error;

/// Central error type for the robot controller
#[derive(Error, Debug)]
pub enum RobotError {
    #[error("Actuator link error: {0}")]
    Actuator(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Vision error: {0}")]
    Vision(String),

    #[error("Voice engine error: {0}")]
    Voice(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for controller operations
pub type RobotResult<T> = Result<T, RobotError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for RobotError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        RobotError::Lock(err.to_string())
    }
}
