//! Temperature/humidity sensor API
//!
//! Sampling is split in two steps, as on most sensor subsystems: a fetch
//! latches one sample from the device, then individual channels are
//! read from the latched sample.

use core::future::Future;

/// Measurement channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorChannel {
    /// Ambient temperature in degrees Celsius
    AmbientTemp,
    /// Relative humidity in percent
    Humidity,
}

/// Fixed-point sensor reading
///
/// `val1` is the integer part, `val2` the fractional part in millionths.
/// Both carry the sign of the reading, so -1.5 is `(-1, -500_000)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorValue {
    pub val1: i32,
    pub val2: i32,
}

impl SensorValue {
    pub const fn new(val1: i32, val2: i32) -> Self {
        Self { val1, val2 }
    }

    /// Build a value from thousandths of a unit
    pub const fn from_milli(milli: i32) -> Self {
        Self {
            val1: milli / 1000,
            val2: (milli % 1000) * 1000,
        }
    }

    /// Fractional part in hundredths, always non-negative
    pub const fn centis(self) -> u8 {
        (self.val2.unsigned_abs() / 10_000 % 100) as u8
    }
}

/// Map a raw reading onto the line through two calibration points
///
/// Points are `(raw, value)`. The result saturates at the `i32` range and
/// a degenerate line (`x0 == x1`) yields `y0`.
pub fn two_point_linear(raw: i16, (x0, y0): (i16, i32), (x1, y1): (i16, i32)) -> i32 {
    if x0 == x1 {
        return y0;
    }
    let (raw, x0, x1) = (i64::from(raw), i64::from(x0), i64::from(x1));
    let (y0, y1) = (i64::from(y0), i64::from(y1));
    let value = y0 + (raw - x0) * (y1 - y0) / (x1 - x0);
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Sensor driver
pub trait Sensor {
    /// Driver error
    type Error: core::fmt::Debug;

    /// Latch a new sample from the device
    fn sample_fetch(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Read one channel of the last latched sample
    fn channel_get(&mut self, channel: SensorChannel) -> Result<SensorValue, Self::Error>;
}
