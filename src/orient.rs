//! Turn toward the speaker
//!
//! The microphone array reports a direction of arrival; the base turns on the
//! spot for a time proportional to the angle, since the motors have no encoder.

pub mod respeaker;

pub use respeaker::ReSpeakerArray;

use crate::actuator::CommandChannel;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Seconds for one full revolution of the base
pub const TIME_PER_CYCLE: f32 = 4.75;
/// Mounting offset between the array's zero and the robot's front
pub const ARRAY_OFFSET_DEG: u16 = 270;
/// Anything closer than this is already facing us
pub const DEAD_ZONE_DEG: u16 = 10;

pub const CLOCKWISE_TOKEN: &str = "a";
pub const COUNTER_CLOCKWISE_TOKEN: &str = "d";

/// Where the last voice came from
pub trait DirectionSource: Send + Sync {
    /// Direction of arrival in degrees, None when no array is attached
    fn direction(&self) -> Option<u16>;
}

/// No microphone array attached
#[derive(Debug, Default)]
pub struct NoArray;

impl DirectionSource for NoArray {
    fn direction(&self) -> Option<u16> {
        None
    }
}

/// The USB array if one is plugged in, otherwise no turning
pub fn create_direction_source() -> Arc<dyn DirectionSource> {
    match ReSpeakerArray::open() {
        Some(array) => Arc::new(array),
        None => {
            warn!("[WARN] Microphone array not found, the robot will not turn to voices");
            Arc::new(NoArray)
        }
    }
}

/// A planned on-the-spot turn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub clockwise: bool,
    pub duration: Duration,
}

impl Rotation {
    pub fn token(&self) -> &'static str {
        if self.clockwise {
            CLOCKWISE_TOKEN
        } else {
            COUNTER_CLOCKWISE_TOKEN
        }
    }
}

/// Turn needed for a raw direction-of-arrival reading, None inside the dead zone
pub fn plan_rotation(doa_deg: u16) -> Option<Rotation> {
    let angle = (doa_deg as u32 + ARRAY_OFFSET_DEG as u32) % 360;
    info!("New target angle: {}", angle);
    if angle < DEAD_ZONE_DEG as u32 {
        return None;
    }

    let clockwise = angle < 180;
    let sweep = if clockwise { angle } else { 360 - angle };
    Some(Rotation {
        clockwise,
        duration: Duration::from_secs_f32(sweep as f32 / 360.0 * TIME_PER_CYCLE),
    })
}

/// Drives the base toward the current speaker
#[derive(Clone)]
pub struct Orienter {
    source: Arc<dyn DirectionSource>,
    stop_token: String,
}

impl Orienter {
    pub fn new(source: Arc<dyn DirectionSource>, stop_token: &str) -> Self {
        Self {
            source,
            stop_token: stop_token.to_string(),
        }
    }

    /// Turn toward the voice; returns the rotation performed, if any
    pub fn face_speaker(&self, channel: &CommandChannel) -> Option<Rotation> {
        let Some(doa) = self.source.direction() else {
            warn!("[WARN] No direction of arrival, not turning");
            return None;
        };

        let rotation = plan_rotation(doa)?;
        channel.send_or_warn(rotation.token());
        std::thread::sleep(rotation.duration);
        channel.send_or_warn(&self.stop_token);
        Some(rotation)
    }
}
