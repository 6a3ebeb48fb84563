//! ST HTS221 humidity and temperature sensor
//!
//! The part runs in one-shot mode: each `sample_fetch` triggers a single
//! conversion, waits for both data-ready bits and latches the raw
//! outputs. Channel reads interpolate against the factory calibration
//! read once at init.

use defmt::{debug, info};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use hal_abstractions::{two_point_linear, Sensor, SensorChannel, SensorValue};

use super::SensorError;

/// 7-bit bus address
pub const ADDRESS: u8 = 0x5F;

const WHO_AM_I: u8 = 0x0F;
const DEVICE_ID: u8 = 0xBC;
const CTRL_REG1: u8 = 0x20;
const CTRL_REG2: u8 = 0x21;
const STATUS_REG: u8 = 0x27;
const HUMIDITY_OUT_L: u8 = 0x28;
const CALIB_START: u8 = 0x30;

/// Sub-address flag for multi-byte reads
const AUTO_INCREMENT: u8 = 0x80;

/// Power on, block data update, one-shot (ODR = 0)
const CTRL_REG1_ACTIVE: u8 = 0x84;
const CTRL_REG2_ONE_SHOT: u8 = 0x01;

const STATUS_T_DA: u8 = 0x01;
const STATUS_H_DA: u8 = 0x02;

const CONVERSION_POLL_MS: u32 = 5;
const CONVERSION_POLLS: usize = 40;

/// Two-point factory calibration
#[derive(Debug, Clone, Copy, defmt::Format)]
struct Calibration {
    /// Relative humidity points in milli-%RH
    h0_milli: i32,
    h1_milli: i32,
    h0_out: i16,
    h1_out: i16,
    /// Temperature points in m°C
    t0_milli: i32,
    t1_milli: i32,
    t0_out: i16,
    t1_out: i16,
}

impl Calibration {
    fn parse(raw: &[u8; 16]) -> Result<Self, SensorError> {
        let word = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        let t0_x8 = (((raw[5] & 0x03) as i32) << 8) | raw[2] as i32;
        let t1_x8 = (((raw[5] & 0x0C) as i32) << 6) | raw[3] as i32;

        let calibration = Self {
            h0_milli: raw[0] as i32 * 500,
            h1_milli: raw[1] as i32 * 500,
            h0_out: word(6),
            h1_out: word(10),
            t0_milli: t0_x8 * 125,
            t1_milli: t1_x8 * 125,
            t0_out: word(12),
            t1_out: word(14),
        };

        if calibration.h0_out == calibration.h1_out || calibration.t0_out == calibration.t1_out {
            return Err(SensorError::Calibration);
        }
        Ok(calibration)
    }

    fn temperature_milli(&self, raw: i16) -> i32 {
        two_point_linear(raw, (self.t0_out, self.t0_milli), (self.t1_out, self.t1_milli))
    }

    fn humidity_milli(&self, raw: i16) -> i32 {
        two_point_linear(raw, (self.h0_out, self.h0_milli), (self.h1_out, self.h1_milli))
            .clamp(0, 100_000)
    }
}

#[derive(Clone, Copy)]
struct Sample {
    humidity: i16,
    temperature: i16,
}

pub struct Hts221<I, D> {
    i2c: I,
    delay: D,
    calibration: Calibration,
    sample: Option<Sample>,
}

impl<I: I2c, D: DelayNs> Hts221<I, D> {
    /// Probe the part, read its calibration and power it up
    pub async fn new(mut i2c: I, delay: D) -> Result<Self, SensorError> {
        let mut id = [0u8];
        i2c.write_read(ADDRESS, &[WHO_AM_I], &mut id)
            .await
            .map_err(|_| SensorError::Bus)?;
        if id[0] != DEVICE_ID {
            return Err(SensorError::UnknownDevice(id[0]));
        }

        let mut raw = [0u8; 16];
        i2c.write_read(ADDRESS, &[CALIB_START | AUTO_INCREMENT], &mut raw)
            .await
            .map_err(|_| SensorError::Bus)?;
        let calibration = Calibration::parse(&raw)?;
        debug!("HTS221 calibration: {}", calibration);

        i2c.write(ADDRESS, &[CTRL_REG1, CTRL_REG1_ACTIVE])
            .await
            .map_err(|_| SensorError::Bus)?;

        info!("HTS221 initialized");
        Ok(Self {
            i2c,
            delay,
            calibration,
            sample: None,
        })
    }

    async fn wait_ready(&mut self) -> Result<(), SensorError> {
        for _ in 0..CONVERSION_POLLS {
            let mut status = [0u8];
            self.i2c
                .write_read(ADDRESS, &[STATUS_REG], &mut status)
                .await
                .map_err(|_| SensorError::Bus)?;
            if status[0] & (STATUS_T_DA | STATUS_H_DA) == STATUS_T_DA | STATUS_H_DA {
                return Ok(());
            }
            self.delay.delay_ms(CONVERSION_POLL_MS).await;
        }
        Err(SensorError::ConversionTimeout)
    }
}

impl<I: I2c, D: DelayNs> Sensor for Hts221<I, D> {
    type Error = SensorError;

    async fn sample_fetch(&mut self) -> Result<(), SensorError> {
        self.i2c
            .write(ADDRESS, &[CTRL_REG2, CTRL_REG2_ONE_SHOT])
            .await
            .map_err(|_| SensorError::Bus)?;
        self.wait_ready().await?;

        let mut out = [0u8; 4];
        self.i2c
            .write_read(ADDRESS, &[HUMIDITY_OUT_L | AUTO_INCREMENT], &mut out)
            .await
            .map_err(|_| SensorError::Bus)?;

        self.sample = Some(Sample {
            humidity: i16::from_le_bytes([out[0], out[1]]),
            temperature: i16::from_le_bytes([out[2], out[3]]),
        });
        Ok(())
    }

    fn channel_get(&mut self, channel: SensorChannel) -> Result<SensorValue, SensorError> {
        let sample = self.sample.ok_or(SensorError::NoSample)?;
        let milli = match channel {
            SensorChannel::AmbientTemp => self.calibration.temperature_milli(sample.temperature),
            SensorChannel::Humidity => self.calibration.humidity_milli(sample.humidity),
        };
        Ok(SensorValue::from_milli(milli))
    }
}
