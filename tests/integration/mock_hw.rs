//! Mock hardware adapters for integration tests.
//!
//! Records every port call so tests can assert on the full command
//! history without touching real GPIO/PWM registers.  The clock is
//! simulated: it only moves when a test advances it or a tone plays.

use std::collections::VecDeque;

use feeder::app::board::{Board, TickOutcome};
use feeder::app::events::AppEvent;
use feeder::app::ports::{
    BatteryPort, ClockPort, EventSink, InputPort, MotorLine, MotorPort, PinConfig, RawEdge,
    ScalePort, SleepPort, Speaker, WakeLevel,
};
use feeder::buttons::ButtonId;
use feeder::config::FeederConfig;
use feeder::error::SensorError;
use feeder::power::RetainedState;

/// Control-loop period used by the helpers below.
pub const TICK_MS: u32 = 10;

// ── Hardware call record ──────────────────────────────────────

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    Duty(MotorLine, u8),
    PwmFrequency(u32),
    Tone { freq_hz: u32, duration_ms: u32 },
    Tare,
    ScalePowerDown,
    ScalePowerUp,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub now: u32,
    pub calls: Vec<HwCall>,

    up_edges: VecDeque<RawEdge>,
    down_edges: VecDeque<RawEdge>,
    pub up_level: bool,
    pub down_level: bool,

    /// Next scale reading (g).
    pub weight: f32,
    /// Added to `weight` after every reading: simulated feed flow.
    pub grams_per_read: f32,
    pub fail_reads: bool,
    pub reads: u32,

    pub battery_percent: u8,
    pub battery_reads: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            now: 0,
            calls: Vec::new(),
            up_edges: VecDeque::new(),
            down_edges: VecDeque::new(),
            up_level: false,
            down_level: false,
            weight: 0.0,
            grams_per_read: 0.0,
            fail_reads: false,
            reads: 0,
            battery_percent: 100,
            battery_reads: 0,
        }
    }

    pub fn queue_edge(&mut self, id: ButtonId, edge: RawEdge) {
        match id {
            ButtonId::Up => self.up_edges.push_back(edge),
            ButtonId::Down => self.down_edges.push_back(edge),
        }
    }

    /// Last duty written to `line`, if any.
    pub fn last_duty(&self, line: MotorLine) -> Option<u8> {
        self.calls.iter().rev().find_map(|c| match c {
            HwCall::Duty(l, d) if *l == line => Some(*d),
            _ => None,
        })
    }

    pub fn tones(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Tone { freq_hz, .. } => Some(*freq_hz),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &HwCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl ClockPort for MockHardware {
    fn now_ms(&self) -> u32 {
        self.now
    }
}

impl InputPort for MockHardware {
    fn poll_button(&mut self, id: ButtonId, _now: u32) -> Option<RawEdge> {
        match id {
            ButtonId::Up => self.up_edges.pop_front(),
            ButtonId::Down => self.down_edges.pop_front(),
        }
    }

    fn any_pressed(&mut self) -> bool {
        self.up_level || self.down_level
    }
}

impl MotorPort for MockHardware {
    fn set_duty(&mut self, line: MotorLine, duty: u8) {
        self.calls.push(HwCall::Duty(line, duty));
    }

    fn set_pwm_frequency(&mut self, hz: u32) {
        self.calls.push(HwCall::PwmFrequency(hz));
    }
}

impl ScalePort for MockHardware {
    fn tare(&mut self, _samples: u8) -> Result<(), SensorError> {
        self.calls.push(HwCall::Tare);
        if self.fail_reads {
            return Err(SensorError::Timeout);
        }
        Ok(())
    }

    fn read_units(&mut self) -> Result<f32, SensorError> {
        if self.fail_reads {
            return Err(SensorError::Timeout);
        }
        self.reads += 1;
        let w = self.weight;
        self.weight += self.grams_per_read;
        Ok(w)
    }

    fn power_down(&mut self) {
        self.calls.push(HwCall::ScalePowerDown);
    }

    fn power_up(&mut self) {
        self.calls.push(HwCall::ScalePowerUp);
    }
}

impl BatteryPort for MockHardware {
    fn percentage(&mut self) -> u8 {
        self.battery_reads += 1;
        self.battery_percent
    }
}

impl Speaker for MockHardware {
    fn make_sound(&mut self, freq_hz: u32, duration_ms: u32) {
        self.calls.push(HwCall::Tone {
            freq_hz,
            duration_ms,
        });
        // Playback blocks the loop.
        self.now = self.now.wrapping_add(duration_ms);
    }
}

// ── MockSleep ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SleepCall {
    Configure(i32, PinConfig),
    HoldEnable(i32),
    HoldDisable(i32),
    Isolate(i32),
    ArmWake(i32, WakeLevel),
    Store(RetainedState),
}

#[derive(Default)]
pub struct MockSleep {
    pub calls: Vec<SleepCall>,
}

#[allow(dead_code)]
impl MockSleep {
    pub fn position(&self, call: &SleepCall) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }

    pub fn stored(&self) -> Option<RetainedState> {
        self.calls.iter().rev().find_map(|c| match c {
            SleepCall::Store(s) => Some(*s),
            _ => None,
        })
    }
}

impl SleepPort for MockSleep {
    fn configure(&mut self, pin: i32, config: PinConfig) {
        self.calls.push(SleepCall::Configure(pin, config));
    }

    fn hold_enable(&mut self, pin: i32) {
        self.calls.push(SleepCall::HoldEnable(pin));
    }

    fn hold_disable(&mut self, pin: i32) {
        self.calls.push(SleepCall::HoldDisable(pin));
    }

    fn isolate(&mut self, pin: i32) {
        self.calls.push(SleepCall::Isolate(pin));
    }

    fn arm_wake(&mut self, pin: i32, level: WakeLevel) {
        self.calls.push(SleepCall::ArmWake(pin, level));
    }

    fn store_retained(&mut self, state: RetainedState) {
        self.calls.push(SleepCall::Store(state));
    }

    fn enter_low_power(&mut self) -> ! {
        panic!("enter_low_power reached in a host test");
    }
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

/// Board + mocks, driven one simulated tick at a time.
pub struct Rig {
    pub board: Board,
    pub hw: MockHardware,
    pub sink: RecordingSink,
    double_click_ms: u32,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(config: FeederConfig, retained: Option<RetainedState>) -> Self {
        Self {
            double_click_ms: config.double_click_interval_ms,
            board: Board::new(config, retained),
            hw: MockHardware::new(),
            sink: RecordingSink::default(),
        }
    }

    /// Construct and run the boot sequence.
    pub fn started(config: FeederConfig, retained: Option<RetainedState>) -> Self {
        let mut rig = Self::new(config, retained);
        rig.board.start(&mut rig.hw, &mut rig.sink);
        rig
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.hw.now = self.hw.now.wrapping_add(TICK_MS);
        self.board.tick(&mut self.hw, &mut self.sink)
    }

    /// Tick for `ms`, stopping early on a sleep request.
    pub fn run_for(&mut self, ms: u32) -> TickOutcome {
        for _ in 0..ms / TICK_MS {
            if let TickOutcome::Sleep(cause) = self.tick() {
                return TickOutcome::Sleep(cause);
            }
        }
        TickOutcome::Continue
    }

    /// Tick until `pred` holds or `max_ms` elapses.  Returns the time taken.
    pub fn run_until(&mut self, max_ms: u32, mut pred: impl FnMut(&Self) -> bool) -> Option<u32> {
        let start = self.hw.now;
        for _ in 0..max_ms / TICK_MS {
            self.tick();
            if pred(self) {
                return Some(self.hw.now.wrapping_sub(start));
            }
        }
        None
    }

    /// Press and release once (two ticks).
    pub fn tap(&mut self, id: ButtonId) {
        self.hw.queue_edge(id, RawEdge::Pressed);
        self.tick();
        self.hw.queue_edge(id, RawEdge::Released);
        self.tick();
    }

    /// A single click, including the wait that tells it apart from a
    /// double-click.
    pub fn click(&mut self, id: ButtonId) -> TickOutcome {
        self.tap(id);
        let wait = self.double_click_ms + 2 * TICK_MS;
        self.run_for(wait)
    }

    pub fn double_click(&mut self, id: ButtonId) -> TickOutcome {
        self.tap(id);
        self.hw.queue_edge(id, RawEdge::Pressed);
        self.tick();
        self.hw.queue_edge(id, RawEdge::Released);
        self.tick()
    }

    pub fn motor_stops(&self) -> Vec<&AppEvent> {
        self.sink
            .events
            .iter()
            .filter(|e| matches!(e, AppEvent::MotorStopped { .. }))
            .collect()
    }
}
