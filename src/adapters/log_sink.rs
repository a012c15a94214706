//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { resumed_from_sleep } => {
                info!("START | resumed_from_sleep={}", resumed_from_sleep);
            }
            AppEvent::Gesture { button, status } => {
                info!("INPUT | {} {:?}", button, status);
            }
            AppEvent::MotorStarted { voltage } => {
                info!("MOTOR | start {:.2} V", voltage);
            }
            AppEvent::VoltageChanged { voltage } => {
                info!("MOTOR | set {:.2} V", voltage);
            }
            AppEvent::MotorStopped {
                reason,
                voltage,
                run_ms,
            } => {
                info!(
                    "MOTOR | stop reason={:?} | last={:.2} V | ran={} ms",
                    reason, voltage, run_ms
                );
            }
            AppEvent::BatteryReport { percent, level } => {
                info!("BATT  | {}% ({})", percent, level);
            }
            AppEvent::FaultDetected(flags) => {
                warn!("FAULT | detected, flags=0b{:08b}", flags);
            }
            AppEvent::FaultCleared => {
                info!("FAULT | all cleared");
            }
            AppEvent::SleepRequested(cause) => {
                info!("SLEEP | cause={:?}", cause);
            }
        }
    }
}
