//! Fuzz target: `Board` under arbitrary button / scale / battery input
//!
//! Each input byte is one control tick: the low bits pick a raw button
//! edge, the high bits perturb the scale and the battery.  Verifies:
//! - No panics
//! - Motor voltage stays inside `[0, motor_max_voltage]`
//! - A run never outlives `motor_max_run_time_ms`
//!
//! cargo fuzz run fuzz_board_inputs

#![no_main]

use feeder::app::board::{Board, TickOutcome};
use feeder::app::events::AppEvent;
use feeder::app::ports::{
    BatteryPort, ClockPort, EventSink, InputPort, MotorLine, MotorPort, RawEdge, ScalePort,
    Speaker,
};
use feeder::buttons::ButtonId;
use feeder::config::FeederConfig;
use feeder::error::SensorError;
use libfuzzer_sys::fuzz_target;

struct FuzzHw {
    now: u32,
    edge: Option<(ButtonId, RawEdge)>,
    weight: f32,
    scale_ok: bool,
    percent: u8,
}

impl ClockPort for FuzzHw {
    fn now_ms(&self) -> u32 {
        self.now
    }
}

impl InputPort for FuzzHw {
    fn poll_button(&mut self, id: ButtonId, _now: u32) -> Option<RawEdge> {
        match self.edge {
            Some((b, e)) if b == id => {
                self.edge = None;
                Some(e)
            }
            _ => None,
        }
    }

    fn any_pressed(&mut self) -> bool {
        false
    }
}

impl MotorPort for FuzzHw {
    fn set_duty(&mut self, _line: MotorLine, _duty: u8) {}
    fn set_pwm_frequency(&mut self, _hz: u32) {}
}

impl ScalePort for FuzzHw {
    fn tare(&mut self, _samples: u8) -> Result<(), SensorError> {
        Ok(())
    }

    fn read_units(&mut self) -> Result<f32, SensorError> {
        if self.scale_ok {
            Ok(self.weight)
        } else {
            Err(SensorError::Timeout)
        }
    }

    fn power_down(&mut self) {}
    fn power_up(&mut self) {}
}

impl BatteryPort for FuzzHw {
    fn percentage(&mut self) -> u8 {
        self.percent
    }
}

impl Speaker for FuzzHw {
    fn make_sound(&mut self, _freq_hz: u32, duration_ms: u32) {
        self.now = self.now.wrapping_add(duration_ms);
    }
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let config = FeederConfig::default();
    let max_v = config.motor_max_voltage;
    let max_run = config.motor_max_run_time_ms;

    let mut hw = FuzzHw {
        now: data.first().map_or(0, |b| u32::from(*b) << 24),
        edge: None,
        weight: 0.0,
        scale_ok: true,
        percent: 100,
    };
    let mut sink = NullSink;
    let mut board = Board::new(config, None);
    board.start(&mut hw, &mut sink);

    for &byte in data {
        let id = if byte & 0x01 == 0 { ButtonId::Up } else { ButtonId::Down };
        hw.edge = match (byte >> 1) & 0x03 {
            0 => None,
            1 => Some((id, RawEdge::Pressed)),
            2 => Some((id, RawEdge::Released)),
            _ => Some((id, RawEdge::Held)),
        };
        hw.weight += f32::from(byte >> 5) * 0.25;
        hw.scale_ok = byte != 0xFF;
        if byte == 0xFE {
            hw.percent = hw.percent.saturating_sub(10);
        }
        // Up to ~1.3 s per tick so long runs are reachable.
        hw.now = hw.now.wrapping_add(10 + u32::from(byte) * 5);

        let outcome = board.tick(&mut hw, &mut sink);

        let v = board.motor().voltage();
        assert!((0.0..=max_v).contains(&v));
        if let Some(run) = board.motor().run_time_ms(hw.now) {
            assert!(run < max_run);
        }
        if let TickOutcome::Sleep(_) = outcome {
            return;
        }
    }
});
