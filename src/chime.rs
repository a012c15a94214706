//! Audible chime patterns.
//!
//! Each chime is a fixed table of notes played back-to-back on whichever
//! [`Speaker`] was selected at init.  A note with `freq_hz == 0` is a rest:
//! speakers keep the output silent for its duration.
//!
//! Playback blocks the control loop; the longest pattern is under a second.

use crate::app::ports::Speaker;
use crate::sensors::battery::BatteryLevel;

/// One tone (or rest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub freq_hz: u32,
    pub duration_ms: u32,
}

const fn note(freq_hz: u32, duration_ms: u32) -> Note {
    Note {
        freq_hz,
        duration_ms,
    }
}

const fn rest(duration_ms: u32) -> Note {
    note(0, duration_ms)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chime {
    /// Rising arpeggio after boot / wake.
    Startup,
    /// Falling arpeggio before deep sleep.
    Sleep,
    /// Battery status, answered on an idle down-click.
    Battery(BatteryLevel),
    /// Played once per boot when the pack drops below the warning level.
    BatteryWarning,
}

const STARTUP: &[Note] = &[note(1000, 150), note(1300, 150), note(1600, 150), note(2000, 200)];
const SLEEP: &[Note] = &[note(1800, 150), note(1400, 150), note(1000, 150), note(600, 300)];

const BATTERY_HIGH: &[Note] = &[
    note(2000, 100),
    rest(80),
    note(2000, 100),
    rest(80),
    note(2000, 100),
];
const BATTERY_MEDIUM: &[Note] = &[note(1500, 120), rest(100), note(1500, 120)];
const BATTERY_LOW: &[Note] = &[note(800, 600)];
const BATTERY_CRITICAL: &[Note] = &[
    note(1200, 150),
    note(900, 150),
    note(600, 150),
    note(400, 300),
];
const BATTERY_WARNING: &[Note] = &[note(700, 150), rest(100), note(700, 150)];

impl Chime {
    pub fn notes(self) -> &'static [Note] {
        match self {
            Self::Startup => STARTUP,
            Self::Sleep => SLEEP,
            Self::Battery(BatteryLevel::High) => BATTERY_HIGH,
            Self::Battery(BatteryLevel::Medium) => BATTERY_MEDIUM,
            Self::Battery(BatteryLevel::Low) => BATTERY_LOW,
            Self::Battery(BatteryLevel::Critical) => BATTERY_CRITICAL,
            Self::BatteryWarning => BATTERY_WARNING,
        }
    }

    /// Total playback time.
    pub fn duration_ms(self) -> u32 {
        self.notes().iter().map(|n| n.duration_ms).sum()
    }
}

/// Play a chime to completion.
pub fn play(speaker: &mut impl Speaker, chime: Chime) {
    for n in chime.notes() {
        speaker.make_sound(n.freq_hz, n.duration_ms);
    }
}
