//! Sensor report payload
//!
//! Fixed 5-byte layout sent with each PUT:
//!
//! ```text
//! offset  content
//! 0       temperature integer part, i8 two's complement (clamped)
//! 1       temperature fraction, hundredths 0..=99
//! 2       reserved, always 0
//! 3       humidity integer part, 0..=255 (clamped)
//! 4       humidity fraction, hundredths 0..=99
//! ```
//!
//! Fractions are magnitudes; the sign of a temperature lives in byte 0.

use hal_abstractions::SensorValue;

use crate::error::NodeError;

/// Encoded length of a sensor payload
pub const PAYLOAD_LEN: usize = 5;

/// Offset of the byte that is always zero
pub const RESERVED_OFFSET: usize = 2;

/// Packed temperature/humidity reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorPayload([u8; PAYLOAD_LEN]);

impl SensorPayload {
    pub fn pack(temperature: SensorValue, humidity: SensorValue) -> Self {
        let temp_whole = temperature.val1.clamp(i8::MIN as i32, i8::MAX as i32) as i8;
        let hum_whole = humidity.val1.clamp(0, u8::MAX as i32) as u8;

        let mut bytes = [0u8; PAYLOAD_LEN];
        bytes[0] = temp_whole as u8;
        bytes[1] = temperature.centis();
        bytes[3] = hum_whole;
        bytes[4] = humidity.centis();
        Self(bytes)
    }

    /// Parse a received payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NodeError> {
        let bytes: [u8; PAYLOAD_LEN] = bytes.try_into().map_err(|_| NodeError::InvalidPayload)?;
        if bytes[RESERVED_OFFSET] != 0 {
            return Err(NodeError::InvalidPayload);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    pub fn temperature_whole(&self) -> i8 {
        self.0[0] as i8
    }

    pub fn temperature_centis(&self) -> u8 {
        self.0[1]
    }

    pub fn humidity_whole(&self) -> u8 {
        self.0[3]
    }

    pub fn humidity_centis(&self) -> u8 {
        self.0[4]
    }
}
