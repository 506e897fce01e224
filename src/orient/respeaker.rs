//! ReSpeaker 4-mic USB array
//!
//! The array's DSP exposes its tuning parameters over vendor control
//! transfers. Direction of arrival is parameter 21, an integer in degrees.

use super::DirectionSource;
use rusb::{Direction, GlobalContext, Recipient, RequestType};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const VENDOR_ID: u16 = 0x2886;
pub const PRODUCT_ID: u16 = 0x0018;

/// Tuning parameter id of DOAANGLE
const DOA_PARAMETER: u16 = 21;
/// Read request for an integer parameter at offset 0
const READ_INT: u16 = 0x80 | 0x40;
const CONTROL_TIMEOUT: Duration = Duration::from_millis(100);

/// Decode a parameter read: two little-endian i32, the first is the value
pub fn decode_direction(response: &[u8]) -> Option<u16> {
    let value = i32::from_le_bytes(response.get(..4)?.try_into().ok()?);
    Some(value.rem_euclid(360) as u16)
}

pub struct ReSpeakerArray {
    handle: Mutex<rusb::DeviceHandle<GlobalContext>>,
}

impl ReSpeakerArray {
    /// None when no array is plugged in or it cannot be opened
    pub fn open() -> Option<Self> {
        let handle = rusb::open_device_with_vid_pid(VENDOR_ID, PRODUCT_ID)?;
        info!(
            "🎙️ ReSpeaker array found ({:04x}:{:04x})",
            VENDOR_ID, PRODUCT_ID
        );
        Some(Self {
            handle: Mutex::new(handle),
        })
    }

    fn read_direction(&self) -> Result<Option<u16>, rusb::Error> {
        let handle = self.handle.lock().unwrap_or_else(|p| p.into_inner());
        let mut response = [0u8; 8];
        let request_type = rusb::request_type(Direction::In, RequestType::Vendor, Recipient::Device);
        let read = handle.read_control(
            request_type,
            0,
            READ_INT,
            DOA_PARAMETER,
            &mut response,
            CONTROL_TIMEOUT,
        )?;
        debug!("DOA response: {:?}", &response[..read]);
        Ok(decode_direction(&response[..read]))
    }
}

impl DirectionSource for ReSpeakerArray {
    fn direction(&self) -> Option<u16> {
        match self.read_direction() {
            Ok(direction) => direction,
            Err(e) => {
                warn!("⚠️ Could not read direction from the microphone array: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_direction() {
        let mut response = [0u8; 8];
        response[..4].copy_from_slice(&180i32.to_le_bytes());
        response[4..].copy_from_slice(&1i32.to_le_bytes());
        assert_eq!(decode_direction(&response), Some(180));

        response[..4].copy_from_slice(&359i32.to_le_bytes());
        assert_eq!(decode_direction(&response), Some(359));
    }

    #[test]
    fn test_decode_wraps_out_of_range_angles() {
        assert_eq!(decode_direction(&(-90i32).to_le_bytes()), Some(270));
        assert_eq!(decode_direction(&450i32.to_le_bytes()), Some(90));
    }

    #[test]
    fn test_short_response_is_rejected() {
        assert_eq!(decode_direction(&[0x10, 0x00]), None);
        assert_eq!(decode_direction(&[]), None);
    }
}
