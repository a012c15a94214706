//! Outbound application events.
//!
//! The [`Board`](super::board::Board) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log today).

use crate::buttons::ButtonId;
use crate::buttons::ButtonStatus;
use crate::sensors::battery::BatteryLevel;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Load cell judged that feed stopped flowing.
    FeedStopped,
    /// Hard run-time ceiling reached.
    MaxRunTime,
    /// Down-click while running.
    UserStop,
    /// Battery critical or going to sleep.
    Shutdown,
}

/// Why the board is going to sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepCause {
    Inactivity,
    /// Down-button double-click.
    UserRequest,
    BatteryCritical,
}

/// Structured events emitted by the feeder core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Board finished its start sequence.
    Started { resumed_from_sleep: bool },

    /// A gesture was dispatched.
    Gesture { button: ButtonId, status: ButtonStatus },

    /// Motor went from idle to running.
    MotorStarted { voltage: f32 },

    /// Throttled or forced setpoint change while running.
    VoltageChanged { voltage: f32 },

    MotorStopped {
        reason: StopReason,
        voltage: f32,
        run_ms: u32,
    },

    BatteryReport { percent: u8, level: BatteryLevel },

    /// One or more safety faults were raised (carries the full bitmask).
    FaultDetected(u8),

    /// All safety faults have been cleared.
    FaultCleared,

    SleepRequested(SleepCause),
}
