//! Port traits: the hexagonal boundary between feeder logic and hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Board (domain)
//! ```
//!
//! Driven adapters (buttons, motor bridge, HX711, battery ADC, speaker,
//! sleep controller) implement these traits.  The [`Board`](super::board::Board)
//! consumes them via generics, so the control core never touches a register
//! and the whole feeding cycle runs on the host under test.

use crate::buttons::ButtonId;
use crate::error::SensorError;
use crate::power::RetainedState;

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond counter.  Wraps at `u32::MAX`; every consumer
/// computes elapsed time with `wrapping_sub`.
pub trait ClockPort {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Buttons (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Debounced edge reported by a [`RawButton`] poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEdge {
    Pressed,
    Released,
    /// Press has lasted past the hold threshold.  Reported once per press.
    Held,
}

/// One debounced physical input.
pub trait RawButton {
    /// Sample the pin and return at most one edge.
    fn poll(&mut self, now: u32) -> Option<RawEdge>;

    /// Debounced level.
    fn is_pressed(&self) -> bool;

    /// Raw pin level, bypassing the debouncer.
    fn read_level(&mut self) -> bool;
}

/// Both feeder buttons, addressed by [`ButtonId`].
pub trait InputPort {
    fn poll_button(&mut self, id: ButtonId, now: u32) -> Option<RawEdge>;

    /// True while either button is physically down (raw level).
    fn any_pressed(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Motor bridge (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// H-bridge input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorLine {
    In1,
    In2,
}

/// Write-side port for the two-line motor driver.
pub trait MotorPort {
    /// Set the 8-bit PWM duty on one line.
    fn set_duty(&mut self, line: MotorLine, duty: u8);

    /// Retune the PWM carrier.
    fn set_pwm_frequency(&mut self, hz: u32);
}

// ───────────────────────────────────────────────────────────────
// Scale (HX711 load cell)
// ───────────────────────────────────────────────────────────────

pub trait ScalePort {
    /// Average `samples` raw readings and store them as the zero offset.
    fn tare(&mut self, samples: u8) -> Result<(), SensorError>;

    /// One calibrated reading in grams.
    fn read_units(&mut self) -> Result<f32, SensorError>;

    fn power_down(&mut self);

    fn power_up(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Battery
// ───────────────────────────────────────────────────────────────

pub trait BatteryPort {
    /// State of charge, 0–100.  Every call takes a fresh sample.
    fn percentage(&mut self) -> u8;
}

// ───────────────────────────────────────────────────────────────
// Speaker (buzzer or motor-as-speaker)
// ───────────────────────────────────────────────────────────────

pub trait Speaker {
    /// Play one tone.  Blocks for `duration_ms`.
    fn make_sound(&mut self, freq_hz: u32, duration_ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Sleep controller
// ───────────────────────────────────────────────────────────────

/// Direction / level a pin is parked in before deep sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinConfig {
    OutputLow,
    OutputHigh,
    InputPullDown,
}

/// Level that wakes the chip from deep sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeLevel {
    Low,
    High,
}

/// Platform low-power primitive plus the per-pin calls used while
/// sequencing lines into their low-leakage state.
pub trait SleepPort {
    fn configure(&mut self, pin: i32, config: PinConfig);

    /// Latch the pin's current state through deep sleep.
    fn hold_enable(&mut self, pin: i32);

    fn hold_disable(&mut self, pin: i32);

    /// Disconnect the pin's digital and RTC paths.
    fn isolate(&mut self, pin: i32);

    /// Arm the single wake source.
    fn arm_wake(&mut self, pin: i32, level: WakeLevel);

    /// Persist the state that must survive the power-down.
    fn store_retained(&mut self, state: RetainedState);

    /// Hand off to the hardware.  Does not return.
    fn enter_low_power(&mut self) -> !;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Composite
// ───────────────────────────────────────────────────────────────

/// Everything the board needs while awake.
pub trait FeederHardware:
    ClockPort + InputPort + MotorPort + ScalePort + BatteryPort + Speaker
{
}

impl<T> FeederHardware for T where
    T: ClockPort + InputPort + MotorPort + ScalePort + BatteryPort + Speaker
{
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// Document failed to deserialize.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
