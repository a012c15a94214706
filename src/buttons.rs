//! Button gesture resolver.
//!
//! Turns the raw release / hold edges of one debounced input into exactly one
//! [`ButtonStatus`] per control-loop tick:
//!
//! ```text
//!   release (from Idle) ──▶ Click? ──resolve──┬─▶ DoubleClick   (pending click ≤ interval old)
//!                                             └─▶ Idle + pending
//!   pending ages past interval ──────────────────▶ Click
//!   hold edge ───────────────────────────────────▶ Hold  (until release)
//! ```
//!
//! A lone click is therefore reported `double_click_interval_ms` late; that
//! latency is the price of distinguishing it from the first half of a
//! double-click.  All elapsed-time maths uses `wrapping_sub`.

/// Which physical button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    Up,
    Down,
}

impl core::fmt::Display for ButtonId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Resolved gesture for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonStatus {
    #[default]
    Idle,
    /// Held past the hold threshold; sustained until release.
    Hold,
    Click,
    DoubleClick,
}

/// Per-button gesture state.
#[derive(Debug, Clone, Default)]
pub struct ButtonState {
    status: ButtonStatus,
    pending_click: bool,
    click_start_ms: u32,
}

impl ButtonState {
    pub const fn new() -> Self {
        Self {
            status: ButtonStatus::Idle,
            pending_click: false,
            click_start_ms: 0,
        }
    }

    /// Release edge from the raw button.
    pub fn on_release(&mut self) {
        match self.status {
            ButtonStatus::Idle => self.status = ButtonStatus::Click,
            ButtonStatus::Hold => self.status = ButtonStatus::Idle,
            ButtonStatus::Click | ButtonStatus::DoubleClick => {}
        }
    }

    /// Hold-threshold edge from the raw button.  Idempotent.
    pub fn on_hold(&mut self) {
        self.status = ButtonStatus::Hold;
    }

    /// Run the double-click bookkeeping.  Call once per tick, after the raw
    /// edges for this tick have been applied.
    pub fn resolve(&mut self, now: u32, interval_ms: u32) {
        match self.status {
            ButtonStatus::Click => {
                if self.pending_click && now.wrapping_sub(self.click_start_ms) <= interval_ms {
                    self.status = ButtonStatus::DoubleClick;
                    self.pending_click = false;
                } else {
                    self.status = ButtonStatus::Idle;
                    self.pending_click = true;
                    self.click_start_ms = now;
                }
            }
            ButtonStatus::Idle => {
                if self.pending_click && now.wrapping_sub(self.click_start_ms) > interval_ms {
                    self.status = ButtonStatus::Click;
                    self.pending_click = false;
                }
            }
            ButtonStatus::Hold | ButtonStatus::DoubleClick => {}
        }
    }

    /// Return the current status, consuming one-shot gestures.
    ///
    /// `Click` and `DoubleClick` reset to `Idle`; `Hold` stays until the
    /// release edge.
    pub fn take(&mut self) -> ButtonStatus {
        let status = self.status;
        if matches!(status, ButtonStatus::Click | ButtonStatus::DoubleClick) {
            self.status = ButtonStatus::Idle;
        }
        status
    }

    pub fn status(&self) -> ButtonStatus {
        self.status
    }

    /// True while a first click waits for a possible second one.
    pub fn has_pending_click(&self) -> bool {
        self.pending_click
    }
}
