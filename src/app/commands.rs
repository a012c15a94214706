//! Inbound commands to the board.
//!
//! Each resolved button gesture maps to at most one command; the
//! [`Board`](super::board::Board) interprets it against the current motor
//! state.

use crate::buttons::{ButtonId, ButtonStatus};

/// Commands the gesture layer can send into the feeder core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Up-click: start at the resume voltage (retained or minimum).
    Start,

    /// Up-double-click: start at full voltage.
    StartBoost,

    /// Up-hold: start at minimum if idle, else step up.
    RampUp,

    /// Down-hold: step down, floored at minimum.
    RampDown,

    /// Down-click: stop if running, battery chime if idle.
    StopOrStatus,

    /// Down-double-click: go to sleep now.
    Shutdown,
}

impl AppCommand {
    /// Gesture → command table.  `Idle` maps to nothing.
    pub fn from_gesture(button: ButtonId, status: ButtonStatus) -> Option<Self> {
        match (button, status) {
            (_, ButtonStatus::Idle) => None,
            (ButtonId::Up, ButtonStatus::Hold) => Some(Self::RampUp),
            (ButtonId::Up, ButtonStatus::Click) => Some(Self::Start),
            (ButtonId::Up, ButtonStatus::DoubleClick) => Some(Self::StartBoost),
            (ButtonId::Down, ButtonStatus::Hold) => Some(Self::RampDown),
            (ButtonId::Down, ButtonStatus::Click) => Some(Self::StopOrStatus),
            (ButtonId::Down, ButtonStatus::DoubleClick) => Some(Self::Shutdown),
        }
    }
}
