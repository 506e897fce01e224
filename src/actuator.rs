//! Actuator command channel
//!
//! Owns the single byte-stream link to the motor microcontroller. Each call
//! writes one newline-terminated ASCII token; nothing is acknowledged.

use crate::config::Config;
use crate::error::{RobotError, RobotResult};
use serialport::SerialPort;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

const SERIAL_TIMEOUT: Duration = Duration::from_millis(200);

/// A byte sink that reaches the microcontroller
pub trait ActuatorLink: Send {
    /// Write one complete frame; implementations flush before returning
    fn write_frame(&mut self, frame: &[u8]) -> RobotResult<()>;

    /// Human readable link name for logs
    fn name(&self) -> &str;
}

/// USB serial link (Arduino style, resets on open)
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialLink {
    /// Open the port and wait for the board to finish booting
    pub fn open(path: &str, baud: u32, boot_delay: Duration) -> RobotResult<Self> {
        let mut port = serialport::new(path, baud)
            .timeout(SERIAL_TIMEOUT)
            .open()
            .map_err(|e| RobotError::Actuator(format!("Failed to open {}: {}", path, e)))?;

        if let Err(e) = port.write_data_terminal_ready(true) {
            warn!("⚠️ Could not raise DTR on {}: {}", path, e);
        }
        std::thread::sleep(boot_delay);

        info!("🔌 Actuator link open on {} @ {} baud", path, baud);
        Ok(Self {
            port,
            path: path.to_string(),
        })
    }
}

impl ActuatorLink for SerialLink {
    fn write_frame(&mut self, frame: &[u8]) -> RobotResult<()> {
        self.port
            .write_all(frame)
            .and_then(|_| self.port.flush())
            .map_err(|e| RobotError::Actuator(format!("Write to {} failed: {}", self.path, e)))
    }

    fn name(&self) -> &str {
        &self.path
    }
}

/// Stand-in when no microcontroller is attached; movement becomes a no-op
#[derive(Debug, Default)]
pub struct NullLink;

impl ActuatorLink for NullLink {
    fn write_frame(&mut self, frame: &[u8]) -> RobotResult<()> {
        debug!(
            "(no actuator) dropping {:?}",
            String::from_utf8_lossy(frame).trim_end()
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Serializes command tokens onto the actuator link, one at a time
pub struct CommandChannel {
    link: Mutex<Box<dyn ActuatorLink>>,
}

impl CommandChannel {
    pub fn new(link: Box<dyn ActuatorLink>) -> Self {
        Self {
            link: Mutex::new(link),
        }
    }

    /// Open the configured serial port, degrading to a null link if it is missing
    pub fn open(config: &Config) -> Self {
        match SerialLink::open(
            &config.serial_port,
            config.baud_rate,
            config.serial_boot_delay(),
        ) {
            Ok(link) => Self::new(Box::new(link)),
            Err(e) => {
                warn!("⚠️ {}", e);
                warn!("   Gestures and rotation are disabled for this run");
                Self::new(Box::new(NullLink))
            }
        }
    }

    /// Write one token; the whole frame goes out under a single lock
    pub fn send(&self, token: &str) -> RobotResult<()> {
        let frame = format!("{}\n", token.trim_end());
        let mut link = self.link.lock()?;
        link.write_frame(frame.as_bytes())?;
        info!("[SERIAL] → {}", token.trim_end());
        Ok(())
    }

    /// Send and log any failure; returns whether the token went out
    pub fn send_or_warn(&self, token: &str) -> bool {
        match self.send(token) {
            Ok(()) => true,
            Err(e) => {
                warn!("❌ Failed to send '{}': {}", token, e);
                false
            }
        }
    }

    pub fn link_name(&self) -> String {
        self.link
            .lock()
            .map(|l| l.name().to_string())
            .unwrap_or_else(|_| "poisoned".to_string())
    }
}
