//! Polled, debounced button driver.
//!
//! ## Hardware
//!
//! Active-high momentary switch with a pull-down.  The pin is sampled from
//! the main loop at control-tick rate; no interrupts are used while awake
//! (the up button doubles as the deep-sleep wake source, armed separately).
//!
//! ## Contact state machine
//!
//! | State     | Leaves when                          | Edge reported |
//! |-----------|--------------------------------------|---------------|
//! | `Open`    | pin reads high                       |               |
//! | `Closing` | high for `debounce_ms`               | `Pressed`     |
//! | `Closed`  | held for `hold_ms` (once per press)  | `Held`        |
//! | `Opening` | low for `debounce_ms`                | `Released`    |
//!
//! A bounce back during `Closing` / `Opening` returns to the previous
//! stable state without reporting anything.  Gesture classification
//! (click, double-click) happens one layer up in [`crate::buttons`].

use embedded_hal::digital::InputPin;

use crate::app::ports::{RawButton, RawEdge};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactState {
    Open,
    Closing { since_ms: u32 },
    Closed { since_ms: u32, held_reported: bool },
    Opening {
        since_ms: u32,
        pressed_since_ms: u32,
        held_reported: bool,
    },
}

pub struct DebouncedButton<P> {
    pin: P,
    state: ContactState,
    debounce_ms: u32,
    hold_ms: u32,
}

impl<P: InputPin> DebouncedButton<P> {
    pub fn new(pin: P, debounce_ms: u32, hold_ms: u32) -> Self {
        Self {
            pin,
            state: ContactState::Open,
            debounce_ms,
            hold_ms,
        }
    }
}

impl<P: InputPin> RawButton for DebouncedButton<P> {
    fn poll(&mut self, now: u32) -> Option<RawEdge> {
        // A failed read keeps the debounced level.
        let level = self.pin.is_high().unwrap_or(self.is_pressed());

        match self.state {
            ContactState::Open => {
                if level {
                    self.state = ContactState::Closing { since_ms: now };
                }
                None
            }

            ContactState::Closing { since_ms } => {
                if !level {
                    self.state = ContactState::Open;
                    return None;
                }
                if now.wrapping_sub(since_ms) >= self.debounce_ms {
                    self.state = ContactState::Closed {
                        since_ms: now,
                        held_reported: false,
                    };
                    return Some(RawEdge::Pressed);
                }
                None
            }

            ContactState::Closed {
                since_ms,
                held_reported,
            } => {
                if !level {
                    self.state = ContactState::Opening {
                        since_ms: now,
                        pressed_since_ms: since_ms,
                        held_reported,
                    };
                    return None;
                }
                if !held_reported && now.wrapping_sub(since_ms) >= self.hold_ms {
                    self.state = ContactState::Closed {
                        since_ms,
                        held_reported: true,
                    };
                    return Some(RawEdge::Held);
                }
                None
            }

            ContactState::Opening {
                since_ms,
                pressed_since_ms,
                held_reported,
            } => {
                if level {
                    self.state = ContactState::Closed {
                        since_ms: pressed_since_ms,
                        held_reported,
                    };
                    return None;
                }
                if now.wrapping_sub(since_ms) >= self.debounce_ms {
                    self.state = ContactState::Open;
                    return Some(RawEdge::Released);
                }
                None
            }
        }
    }

    fn is_pressed(&self) -> bool {
        matches!(
            self.state,
            ContactState::Closed { .. } | ContactState::Opening { .. }
        )
    }

    /// A failed read counts as released.
    fn read_level(&mut self) -> bool {
        self.pin.is_high().unwrap_or(false)
    }
}
