//! Two-line H-bridge driver on LEDC timer 0.
//!
//! IN1 carries the PWM, IN2 is parked at duty 0 so the motor only turns one
//! way.  The same bridge doubles as a speaker: retuning the carrier into the
//! audible range and driving a small voltage makes the winding sing without
//! turning the auger.

use log::debug;

use super::hw_init::{self, LEDC_CH_MOTOR_IN1, LEDC_CH_MOTOR_IN2, LEDC_TIMER_MOTOR};
use crate::app::ports::{MotorLine, MotorPort, Speaker};
use crate::config::FeederConfig;

/// Winding voltage used for tones; too low to overcome static friction.
pub const TONE_VOLTAGE: f32 = 0.3;

/// Duty that produces `volts` on a bridge whose full scale is `max_voltage`.
pub fn duty_for_voltage(volts: f32, max_voltage: f32) -> u8 {
    if !(volts.is_finite() && max_voltage > 0.0) {
        return 0;
    }
    ((volts / max_voltage).clamp(0.0, 1.0) * 255.0).round() as u8
}

pub struct MotorPwm {
    carrier_hz: u32,
    tone_duty: u8,
}

impl MotorPwm {
    pub fn new(config: &FeederConfig) -> Self {
        Self {
            carrier_hz: config.motor_pwm_freq_hz,
            tone_duty: duty_for_voltage(TONE_VOLTAGE, config.motor_max_voltage),
        }
    }

    pub fn tone_duty(&self) -> u8 {
        self.tone_duty
    }
}

impl MotorPort for MotorPwm {
    fn set_duty(&mut self, line: MotorLine, duty: u8) {
        let channel = match line {
            MotorLine::In1 => LEDC_CH_MOTOR_IN1,
            MotorLine::In2 => LEDC_CH_MOTOR_IN2,
        };
        hw_init::ledc_set(channel, duty);
    }

    fn set_pwm_frequency(&mut self, hz: u32) {
        hw_init::ledc_set_freq(LEDC_TIMER_MOTOR, hz);
    }
}

impl Speaker for MotorPwm {
    fn make_sound(&mut self, freq_hz: u32, duration_ms: u32) {
        if freq_hz == 0 {
            hw_init::delay_ms(duration_ms);
            return;
        }
        debug!("motor_pwm: tone {freq_hz} Hz for {duration_ms} ms");
        self.set_pwm_frequency(freq_hz);
        self.set_duty(MotorLine::In1, self.tone_duty);
        hw_init::delay_ms(duration_ms);
        self.set_duty(MotorLine::In1, 0);
        self.set_pwm_frequency(self.carrier_hz);
    }
}
