//! Audio capture module using cpal

pub mod engine;

pub use engine::{ClipPlayer, SoundEngine};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{info, warn};

pub const SAMPLE_RATE: u32 = 16000;
pub const FRAME_LENGTH: usize = 512;

/// One PortAudio-style device entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub index: usize,
    pub name: String,
    pub input: bool,
    pub output: bool,
}

impl std::fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut io = Vec::new();
        if self.input {
            io.push("in");
        }
        if self.output {
            io.push("out");
        }
        write!(f, "{:2}: {}  ({})", self.index, self.name, io.join(", "))
    }
}

/// Enumerate every device of the default host
pub fn devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut found = Vec::new();

    for (index, device) in host.devices()?.enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let input = device
            .supported_input_configs()
            .map(|mut c| c.next().is_some())
            .unwrap_or(false);
        let output = device
            .supported_output_configs()
            .map(|mut c| c.next().is_some())
            .unwrap_or(false);
        found.push(AudioDevice {
            index,
            name,
            input,
            output,
        });
    }

    Ok(found)
}

/// Live microphone stream; dropping it stops capture
pub struct Capture {
    _stream: cpal::Stream,
    pub device_name: String,
}

/// Start audio capture and return the stream guard plus a receiver for frames
pub fn start_capture(device_index: Option<usize>) -> Result<(Capture, Receiver<Vec<i16>>)> {
    let host = cpal::default_host();

    let device = if let Some(idx) = device_index {
        host.input_devices()?
            .nth(idx)
            .context("Device index out of range")?
    } else {
        host.default_input_device()
            .context("No default input device")?
    };

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio input device: {}", device_name);

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Fixed(FRAME_LENGTH as u32),
    };

    let (tx, rx): (Sender<Vec<i16>>, Receiver<Vec<i16>>) = mpsc::channel();

    // The callback only copies the frame out; classification happens elsewhere
    let stream = device.build_input_stream(
        &config,
        move |data: &[i16], _: &cpal::InputCallbackInfo| {
            let _ = tx.send(data.to_vec());
        },
        |err| {
            warn!("[AUDIO] stream error: {}", err);
        },
        None,
    )?;

    stream.play()?;

    Ok((
        Capture {
            _stream: stream,
            device_name,
        },
        rx,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_display() {
        let dev = AudioDevice {
            index: 2,
            name: "ReSpeaker 4 Mic Array".to_string(),
            input: true,
            output: false,
        };
        assert_eq!(dev.to_string(), " 2: ReSpeaker 4 Mic Array  (in)");

        let duplex = AudioDevice {
            index: 10,
            name: "default".to_string(),
            input: true,
            output: true,
        };
        assert_eq!(duplex.to_string(), "10: default  (in, out)");
    }
}
