//! Wall-E Library
//!
//! Core modules for the Wall-E robot controller: voice intents drive gestures,
//! sounds and a face recognizer that learns new people by name.

pub mod actions;
pub mod actuator;
pub mod audio;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod exchange;
pub mod faces;
pub mod fsm;
pub mod orient;
pub mod shutdown;
pub mod speech;
pub mod vision;
pub mod voice;
