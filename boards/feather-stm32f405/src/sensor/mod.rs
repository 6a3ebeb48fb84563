//! On-board sensors

pub mod hts221;

pub use hts221::Hts221;

use defmt::Format;

/// Sensor driver failures
#[derive(Debug, Clone, Copy, Format)]
pub enum SensorError {
    /// I2C transfer failed
    Bus,
    /// WHO_AM_I returned an unexpected id
    UnknownDevice(u8),
    /// Factory calibration points coincide
    Calibration,
    /// Data-ready bits never came up
    ConversionTimeout,
    /// Channel read before the first successful fetch
    NoSample,
}

impl core::fmt::Display for SensorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus => write!(f, "I2C transfer failed"),
            Self::UnknownDevice(id) => write!(f, "Unknown device id 0x{:02x}", id),
            Self::Calibration => write!(f, "Invalid factory calibration"),
            Self::ConversionTimeout => write!(f, "Conversion timeout"),
            Self::NoSample => write!(f, "No sample fetched"),
        }
    }
}

impl core::error::Error for SensorError {}
