//! Feed-motor voltage controller.
//!
//! Owns the voltage setpoint and turns it into IN1 duty on the H-bridge.
//! Non-forced writes are throttled to one per `motor_update_interval_ms`;
//! the first non-forced write after a reset only arms the throttle, which
//! swallows the click's own debounce latency.  Forced writes (click starts,
//! stops) always apply.
//!
//! Run-time bounds are enforced here independently of the load cell:
//!
//! ```text
//!   elapsed < min_run   → never stop (sensor settling, grace period)
//!   elapsed ≥ max_run   → always stop (hard ceiling)
//! ```

use log::debug;

use crate::app::ports::{MotorLine, MotorPort};
use crate::config::FeederConfig;

/// Full-scale 8-bit duty.
const DUTY_MAX: f32 = 255.0;

pub struct Motor {
    voltage: f32,
    start_ms: Option<u32>,
    last_update_ms: Option<u32>,

    min_voltage: f32,
    max_voltage: f32,
    step: f32,
    update_interval_ms: u32,
    min_run_ms: u32,
    max_run_ms: u32,
}

impl Motor {
    pub fn new(config: &FeederConfig) -> Self {
        Self {
            voltage: 0.0,
            start_ms: None,
            last_update_ms: None,
            min_voltage: config.motor_min_voltage,
            max_voltage: config.motor_max_voltage,
            step: config.motor_voltage_step,
            update_interval_ms: config.motor_update_interval_ms,
            min_run_ms: config.effective_min_run_time_ms(),
            max_run_ms: config.motor_max_run_time_ms,
        }
    }

    /// Request a new setpoint.  Returns `true` if the output changed
    /// (i.e. the write was not throttled).
    pub fn set_voltage(
        &mut self,
        target: f32,
        force: bool,
        now: u32,
        port: &mut impl MotorPort,
    ) -> bool {
        if !force {
            match self.last_update_ms {
                None => {
                    self.last_update_ms = Some(now);
                    return false;
                }
                Some(t) if now.wrapping_sub(t) < self.update_interval_ms => return false,
                Some(_) => {}
            }
        }

        let v = if target.is_finite() {
            target.clamp(0.0, self.max_voltage)
        } else {
            0.0
        };
        port.set_duty(MotorLine::In1, self.duty_for(v));
        self.voltage = v;
        self.last_update_ms = Some(now);

        if v > 0.0 {
            self.start_ms.get_or_insert(now);
        } else {
            self.start_ms = None;
        }
        debug!("Motor: {v:.2} V (force={force})");
        true
    }

    /// Forced stop; also clears the run timer and the throttle record.
    pub fn reset(&mut self, now: u32, port: &mut impl MotorPort) {
        self.set_voltage(0.0, true, now, port);
        self.start_ms = None;
        self.last_update_ms = None;
    }

    /// Hold-to-increase.  Starts at minimum voltage when idle.
    pub fn ramp_up(&mut self, now: u32, port: &mut impl MotorPort) -> bool {
        let target = if self.is_running() {
            self.voltage + self.step
        } else {
            self.min_voltage
        };
        self.set_voltage(target, false, now, port)
    }

    /// Hold-to-decrease.  Floors at minimum voltage, never stops the motor.
    pub fn ramp_down(&mut self, now: u32, port: &mut impl MotorPort) -> bool {
        if !self.is_running() {
            return false;
        }
        let target = (self.voltage - self.step).max(self.min_voltage);
        self.set_voltage(target, false, now, port)
    }

    /// Run-time verdict, ignoring the load cell.
    pub fn should_stop(&self, now: u32) -> bool {
        match self.run_time_ms(now) {
            Some(elapsed) if elapsed >= self.min_run_ms => elapsed >= self.max_run_ms,
            _ => false,
        }
    }

    /// True while a run is younger than the minimum run time.
    pub fn in_grace_period(&self, now: u32) -> bool {
        self.run_time_ms(now)
            .is_some_and(|elapsed| elapsed < self.min_run_ms)
    }

    pub fn run_time_ms(&self, now: u32) -> Option<u32> {
        self.start_ms.map(|t| now.wrapping_sub(t))
    }

    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    pub fn is_running(&self) -> bool {
        self.voltage > 0.0
    }

    pub fn min_voltage(&self) -> f32 {
        self.min_voltage
    }

    pub fn max_voltage(&self) -> f32 {
        self.max_voltage
    }

    fn duty_for(&self, v: f32) -> u8 {
        (v / self.max_voltage * DUTY_MAX).round().clamp(0.0, DUTY_MAX) as u8
    }
}
