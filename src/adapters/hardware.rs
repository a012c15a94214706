//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns both button drivers, the motor bridge, the scale, the battery
//! monitor and the speaker chosen at init, exposing them through the
//! [`FeederHardware`](crate::app::ports::FeederHardware) ports.  This is
//! the only module in the system that touches actual hardware.  On
//! non-espidf targets, the underlying helpers use cfg-gated stubs.

use log::warn;

use super::time::Esp32TimeAdapter;
use crate::app::ports::{
    BatteryPort, ClockPort, InputPort, MotorLine, MotorPort, RawButton, RawEdge, ScalePort,
    Speaker,
};
use crate::buttons::ButtonId;
use crate::config::{FeederConfig, SpeakerKind};
use crate::drivers::buzzer::Buzzer;
use crate::drivers::hw_init::{self, ADC1_CH_BATTERY};
use crate::drivers::motor_pwm::MotorPwm;
use crate::error::SensorError;
use crate::sensors::battery::BatteryMonitor;

/// Tone output selected once at boot.
enum SpeakerOutput {
    Buzzer(Buzzer),
    Motor,
}

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<UP, DOWN, SCALE> {
    clock: Esp32TimeAdapter,
    up: UP,
    down: DOWN,
    scale: SCALE,
    motor: MotorPwm,
    speaker: SpeakerOutput,
    battery: BatteryMonitor,
    /// Last good reading; reused when the ADC read fails.
    last_percent: u8,
}

impl<UP, DOWN, SCALE> HardwareAdapter<UP, DOWN, SCALE>
where
    UP: RawButton,
    DOWN: RawButton,
    SCALE: ScalePort,
{
    pub fn new(config: &FeederConfig, up: UP, down: DOWN, scale: SCALE) -> Self {
        let speaker = match config.speaker {
            SpeakerKind::Buzzer => SpeakerOutput::Buzzer(Buzzer::new()),
            SpeakerKind::Motor => SpeakerOutput::Motor,
        };
        Self {
            clock: Esp32TimeAdapter::new(),
            up,
            down,
            scale,
            motor: MotorPwm::new(config),
            speaker,
            battery: BatteryMonitor::new(config),
            last_percent: 100,
        }
    }
}

// ── ClockPort ─────────────────────────────────────────────────

impl<UP, DOWN, SCALE> ClockPort for HardwareAdapter<UP, DOWN, SCALE> {
    fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }
}

// ── InputPort ─────────────────────────────────────────────────

impl<UP: RawButton, DOWN: RawButton, SCALE> InputPort for HardwareAdapter<UP, DOWN, SCALE> {
    fn poll_button(&mut self, id: ButtonId, now: u32) -> Option<RawEdge> {
        match id {
            ButtonId::Up => self.up.poll(now),
            ButtonId::Down => self.down.poll(now),
        }
    }

    fn any_pressed(&mut self) -> bool {
        // Both pins are sampled every call.
        let up = self.up.read_level();
        let down = self.down.read_level();
        up || down
    }
}

// ── MotorPort ─────────────────────────────────────────────────

impl<UP, DOWN, SCALE> MotorPort for HardwareAdapter<UP, DOWN, SCALE> {
    fn set_duty(&mut self, line: MotorLine, duty: u8) {
        self.motor.set_duty(line, duty);
    }

    fn set_pwm_frequency(&mut self, hz: u32) {
        self.motor.set_pwm_frequency(hz);
    }
}

// ── ScalePort ─────────────────────────────────────────────────

impl<UP, DOWN, SCALE: ScalePort> ScalePort for HardwareAdapter<UP, DOWN, SCALE> {
    fn tare(&mut self, samples: u8) -> Result<(), SensorError> {
        self.scale.tare(samples)
    }

    fn read_units(&mut self) -> Result<f32, SensorError> {
        self.scale.read_units()
    }

    fn power_down(&mut self) {
        self.scale.power_down();
    }

    fn power_up(&mut self) {
        self.scale.power_up();
    }
}

// ── BatteryPort ───────────────────────────────────────────────

impl<UP, DOWN, SCALE> BatteryPort for HardwareAdapter<UP, DOWN, SCALE> {
    fn percentage(&mut self) -> u8 {
        match hw_init::adc1_read(ADC1_CH_BATTERY) {
            Ok(raw) => self.last_percent = self.battery.percentage(raw),
            Err(e) => warn!("Battery: {e}, reusing {}%", self.last_percent),
        }
        self.last_percent
    }
}

// ── Speaker ───────────────────────────────────────────────────

impl<UP, DOWN, SCALE> Speaker for HardwareAdapter<UP, DOWN, SCALE> {
    fn make_sound(&mut self, freq_hz: u32, duration_ms: u32) {
        match &mut self.speaker {
            SpeakerOutput::Buzzer(b) => b.make_sound(freq_hz, duration_ms),
            SpeakerOutput::Motor => self.motor.make_sound(freq_hz, duration_ms),
        }
    }
}
