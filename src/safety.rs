//! Safety supervisor.
//!
//! The supervisor is fed by the board whenever the battery is sampled and
//! after every load-cell read, and accumulates a fault bitmask.
//!
//! ## Fault lifecycle
//!
//! 1. A condition triggers a fault (e.g. pack below the critical level).
//! 2. The supervisor sets the corresponding bit.
//! 3. The board reacts: `BatteryCritical` forces stop-and-sleep regardless
//!    of user input; `BatteryLow` plays the warning chime once;
//!    `ScaleUnresponsive` is reported only, the motor run-time ceiling
//!    still ends the run.
//! 4. On each re-evaluation the bit is cleared if the condition is gone.

use log::{error, info};

use crate::config::FeederConfig;
use crate::error::SafetyFault;
use crate::sensors::battery::BatteryLevel;

/// Consecutive failed scale reads before the scale is declared unresponsive.
pub const SCALE_FAILURE_LIMIT: u8 = 3;

pub struct SafetySupervisor {
    /// Latched fault bitmask.
    faults: u8,
    scale_failures: u8,
    /// Warning chime already played this boot.
    low_warning_given: bool,
    battery_check_interval_ms: u32,
    last_battery_check_ms: Option<u32>,
}

impl SafetySupervisor {
    pub fn new(config: &FeederConfig) -> Self {
        Self {
            faults: 0,
            scale_failures: 0,
            low_warning_given: false,
            battery_check_interval_ms: config.battery_check_interval_ms,
            last_battery_check_ms: None,
        }
    }

    /// True when the battery should be sampled again.
    pub fn battery_check_due(&self, now: u32) -> bool {
        self.last_battery_check_ms
            .is_none_or(|t| now.wrapping_sub(t) >= self.battery_check_interval_ms)
    }

    /// Evaluate a fresh battery level.  Returns the updated fault bitmask.
    pub fn evaluate_battery(&mut self, level: BatteryLevel, now: u32) -> u8 {
        self.last_battery_check_ms = Some(now);
        self.eval_fault(
            SafetyFault::BatteryCritical,
            level == BatteryLevel::Critical,
        );
        self.eval_fault(
            SafetyFault::BatteryLow,
            matches!(level, BatteryLevel::Critical | BatteryLevel::Low),
        );
        self.faults
    }

    /// Record the outcome of one scale read.
    pub fn record_scale_read(&mut self, ok: bool) -> u8 {
        if ok {
            self.scale_failures = 0;
        } else {
            self.scale_failures = self.scale_failures.saturating_add(1);
        }
        self.eval_fault(
            SafetyFault::ScaleUnresponsive,
            self.scale_failures >= SCALE_FAILURE_LIMIT,
        );
        self.faults
    }

    /// Returns `true` exactly once per boot while `BatteryLow` is set.
    pub fn take_low_warning(&mut self) -> bool {
        if self.has_fault(SafetyFault::BatteryLow) && !self.low_warning_given {
            self.low_warning_given = true;
            return true;
        }
        false
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a fault bit based on a boolean condition.
    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("SAFETY FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("SAFETY FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}
