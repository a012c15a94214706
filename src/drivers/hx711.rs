//! HX711 24-bit load-cell amplifier, bit-banged over two GPIOs.
//!
//! ```text
//!   DOUT high ─── not ready
//!   DOUT low  ─── 24 SCK pulses, MSB first, then 1 extra pulse
//!                 (channel A, gain 128 for the next conversion)
//!   SCK high > 60 µs ─── chip powers down
//! ```
//!
//! Readings are converted to grams with a tare offset (raw counts) and a
//! calibration factor (counts per gram).

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, warn};

use crate::app::ports::ScalePort;
use crate::error::SensorError;

/// Extra pulses after the 24 data bits: channel A, gain 128.
const GAIN_PULSES: u8 = 1;
/// Polling step while waiting for DOUT to go low.
const READY_POLL_US: u32 = 200;
/// SCK high time that guarantees power-down.
const POWER_DOWN_US: u32 = 80;
/// At 10 SPS a conversion is ready within 100 ms.
pub const DEFAULT_READY_TIMEOUT_MS: u32 = 150;

pub struct Hx711<DOUT, SCK, D> {
    dout: DOUT,
    sck: SCK,
    delay: D,
    offset: i32,
    counts_per_gram: f32,
    ready_timeout_ms: u32,
}

impl<DOUT, SCK, D> Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    pub fn new(dout: DOUT, mut sck: SCK, delay: D, counts_per_gram: f32) -> Self {
        // Clock idles low; a failure here surfaces on the first read.
        let _ = sck.set_low();
        let counts_per_gram = if counts_per_gram.is_finite() && counts_per_gram != 0.0 {
            counts_per_gram
        } else {
            warn!("hx711: invalid calibration factor {counts_per_gram}, using 1.0");
            1.0
        };
        Self {
            dout,
            sck,
            delay,
            offset: 0,
            counts_per_gram,
            ready_timeout_ms: DEFAULT_READY_TIMEOUT_MS,
        }
    }

    pub fn with_ready_timeout(mut self, ms: u32) -> Self {
        self.ready_timeout_ms = ms;
        self
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// One signed 24-bit conversion.
    pub fn read_raw(&mut self) -> Result<i32, SensorError> {
        self.wait_ready()?;

        let mut value: i32 = 0;
        for _ in 0..24 {
            self.pulse()?;
            let bit = self.dout.is_high().map_err(|_| SensorError::GpioReadFailed)?;
            value = (value << 1) | i32::from(bit);
        }
        for _ in 0..GAIN_PULSES {
            self.pulse()?;
        }

        // Sign extend 24-bit
        if value & 0x80_0000 != 0 {
            value |= !0xFF_FFFF;
        }
        debug!("hx711: raw={value}");
        Ok(value)
    }

    fn wait_ready(&mut self) -> Result<(), SensorError> {
        let max_polls = self.ready_timeout_ms.saturating_mul(1_000) / READY_POLL_US;
        let mut polls = 0;
        while self.dout.is_high().map_err(|_| SensorError::GpioReadFailed)? {
            if polls >= max_polls {
                return Err(SensorError::Timeout);
            }
            polls += 1;
            self.delay.delay_us(READY_POLL_US);
        }
        Ok(())
    }

    fn pulse(&mut self) -> Result<(), SensorError> {
        self.sck.set_high().map_err(|_| SensorError::GpioReadFailed)?;
        self.delay.delay_us(1);
        self.sck.set_low().map_err(|_| SensorError::GpioReadFailed)?;
        self.delay.delay_us(1);
        Ok(())
    }
}

impl<DOUT, SCK, D> ScalePort for Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    fn tare(&mut self, samples: u8) -> Result<(), SensorError> {
        let samples = samples.max(1);
        let mut sum: i64 = 0;
        for _ in 0..samples {
            sum += i64::from(self.read_raw()?);
        }
        self.offset = (sum / i64::from(samples)) as i32;
        debug!("hx711: tare offset={}", self.offset);
        Ok(())
    }

    fn read_units(&mut self) -> Result<f32, SensorError> {
        let raw = self.read_raw()?;
        Ok(raw.wrapping_sub(self.offset) as f32 / self.counts_per_gram)
    }

    fn power_down(&mut self) {
        let _ = self.sck.set_low();
        let _ = self.sck.set_high();
        self.delay.delay_us(POWER_DOWN_US);
    }

    fn power_up(&mut self) {
        let _ = self.sck.set_low();
    }
}
