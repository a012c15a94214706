//! Board: the feeder's control loop.
//!
//! Pure orchestration: owns the motor controller, the load-cell detector,
//! both gesture resolvers and the safety supervisor, and talks to hardware
//! only through the port traits.  Runs identically on target and host.
//!
//! ```text
//!   main loop (10 ms)
//!     └─ Board::tick()
//!          ├─ battery guard           (critical → stop + sleep)
//!          ├─ poll raw buttons → ButtonState::resolve/take
//!          ├─ handle_button_action()  (gesture → AppCommand → Motor)
//!          ├─ process_feeding_cycle() (LoadCell + run-time bounds)
//!          └─ sleep_cause()           (inactivity | gesture)
//! ```
//!
//! Deep sleep is split in two: [`Board::prepare_for_sleep`] does all the
//! work and is testable, [`Board::enter_deep_sleep`] adds the diverging
//! hand-off to the platform.

use log::{info, warn};

use super::commands::AppCommand;
use super::events::{AppEvent, SleepCause, StopReason};
use super::ports::{EventSink, FeederHardware, MotorLine, RawEdge, SleepPort};
use crate::buttons::{ButtonId, ButtonState, ButtonStatus};
use crate::chime::{self, Chime};
use crate::config::FeederConfig;
use crate::control::motor::Motor;
use crate::error::SafetyFault;
use crate::power::{self, RetainedState};
use crate::safety::SafetySupervisor;
use crate::sensors::battery::{BatteryLevel, BatteryMonitor};
use crate::sensors::load_cell::LoadCell;

/// Result of one [`Board::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// Caller should run [`Board::enter_deep_sleep`].
    Sleep(SleepCause),
}

pub struct Board {
    config: FeederConfig,
    motor: Motor,
    load_cell: LoadCell,
    up: ButtonState,
    down: ButtonState,
    safety: SafetySupervisor,
    battery: BatteryMonitor,

    last_motor_active_ms: u32,
    last_button_active_ms: u32,
    /// Start of the post-click settle delay, while it runs.
    settle_since_ms: Option<u32>,
    shutdown_requested: bool,

    retained: RetainedState,
    first_resume_after_wake: bool,
    resumed_from_sleep: bool,
}

impl Board {
    /// `retained` is the record read back from RTC memory at boot, if any.
    pub fn new(config: FeederConfig, retained: Option<RetainedState>) -> Self {
        let resumed_from_sleep = retained.is_some();
        let retained = retained.unwrap_or(RetainedState { motor_voltage: 0.0 });
        Self {
            motor: Motor::new(&config),
            load_cell: LoadCell::new(&config),
            up: ButtonState::new(),
            down: ButtonState::new(),
            safety: SafetySupervisor::new(&config),
            battery: BatteryMonitor::new(&config),
            last_motor_active_ms: 0,
            last_button_active_ms: 0,
            settle_since_ms: None,
            shutdown_requested: false,
            first_resume_after_wake: retained.motor_voltage > 0.0,
            resumed_from_sleep,
            retained,
            config,
        }
    }

    /// Boot sequence: motor off, startup chime, first battery check.
    pub fn start(&mut self, hw: &mut impl FeederHardware, sink: &mut impl EventSink) {
        let now = hw.now_ms();
        self.motor.reset(now, hw);
        hw.set_duty(MotorLine::In2, 0);
        hw.power_up();

        chime::play(hw, Chime::Startup);

        let now = hw.now_ms();
        self.last_motor_active_ms = now;
        self.last_button_active_ms = now;
        self.check_battery(now, hw, sink);
        if !self.safety.has_fault(SafetyFault::BatteryCritical) && self.safety.take_low_warning() {
            chime::play(hw, Chime::BatteryWarning);
        }

        info!(
            "Board: started (resume={}, retained={:.2} V)",
            self.resumed_from_sleep, self.retained.motor_voltage
        );
        sink.emit(&AppEvent::Started {
            resumed_from_sleep: self.resumed_from_sleep,
        });
    }

    /// One control-loop iteration.
    pub fn tick(
        &mut self,
        hw: &mut impl FeederHardware,
        sink: &mut impl EventSink,
    ) -> TickOutcome {
        let now = hw.now_ms();

        // ── Battery guard ─────────────────────────────────────────
        if self.safety.battery_check_due(now) {
            self.check_battery(now, hw, sink);
        }
        if self.safety.has_fault(SafetyFault::BatteryCritical) {
            warn!("Board: battery critical, forcing shutdown");
            self.stop_and_reset(now, StopReason::Shutdown, hw, sink);
            sink.emit(&AppEvent::SleepRequested(SleepCause::BatteryCritical));
            return TickOutcome::Sleep(SleepCause::BatteryCritical);
        }

        // ── Buttons ───────────────────────────────────────────────
        for id in [ButtonId::Up, ButtonId::Down] {
            if let Some(edge) = hw.poll_button(id, now) {
                let state = self.button_mut(id);
                match edge {
                    RawEdge::Released => state.on_release(),
                    RawEdge::Held => state.on_hold(),
                    RawEdge::Pressed => {}
                }
                self.last_button_active_ms = now;
            }
        }
        let interval = self.config.double_click_interval_ms;
        self.up.resolve(now, interval);
        self.down.resolve(now, interval);

        let up = self.up.take();
        let down = self.down.take();
        if up != ButtonStatus::Idle || down != ButtonStatus::Idle {
            self.last_button_active_ms = now;
        }
        self.handle_button_action(ButtonId::Up, up, now, hw, sink);
        self.handle_button_action(ButtonId::Down, down, now, hw, sink);

        // ── Feeding ───────────────────────────────────────────────
        self.process_feeding_cycle(now, hw, sink);

        if !self.motor.is_running() && self.safety.take_low_warning() {
            chime::play(hw, Chime::BatteryWarning);
        }

        // ── Sleep ─────────────────────────────────────────────────
        match self.sleep_cause(now) {
            Some(cause) => {
                sink.emit(&AppEvent::SleepRequested(cause));
                TickOutcome::Sleep(cause)
            }
            None => TickOutcome::Continue,
        }
    }

    /// Dispatch one resolved gesture.
    pub fn handle_button_action(
        &mut self,
        button: ButtonId,
        status: ButtonStatus,
        now: u32,
        hw: &mut impl FeederHardware,
        sink: &mut impl EventSink,
    ) {
        let Some(cmd) = AppCommand::from_gesture(button, status) else {
            return;
        };
        if matches!(status, ButtonStatus::Click | ButtonStatus::DoubleClick) {
            sink.emit(&AppEvent::Gesture { button, status });
        }
        self.handle_command(cmd, now, hw, sink);
    }

    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now: u32,
        hw: &mut impl FeederHardware,
        sink: &mut impl EventSink,
    ) {
        let was_running = self.motor.is_running();
        match cmd {
            AppCommand::Start => {
                let target = self.resume_voltage();
                self.start_run(target, now, hw);
            }
            AppCommand::StartBoost => {
                let target = self.motor.max_voltage();
                self.start_run(target, now, hw);
            }
            AppCommand::RampUp => {
                if !self.motor.ramp_up(now, hw) {
                    return;
                }
            }
            AppCommand::RampDown => {
                if !self.motor.ramp_down(now, hw) {
                    return;
                }
            }
            AppCommand::StopOrStatus => {
                if was_running {
                    self.stop_and_reset(now, StopReason::UserStop, hw, sink);
                } else {
                    let (percent, level) = self.read_battery(hw);
                    info!("Board: battery {percent}% ({level})");
                    sink.emit(&AppEvent::BatteryReport { percent, level });
                    chime::play(hw, Chime::Battery(level));
                }
                return;
            }
            AppCommand::Shutdown => {
                info!("Board: shutdown requested");
                self.shutdown_requested = true;
                return;
            }
        }

        let voltage = self.motor.voltage();
        if was_running {
            sink.emit(&AppEvent::VoltageChanged { voltage });
        } else if self.motor.is_running() {
            sink.emit(&AppEvent::MotorStarted { voltage });
        }
    }

    /// Advance the load cell and apply the stop rules while the motor runs.
    pub fn process_feeding_cycle(
        &mut self,
        now: u32,
        hw: &mut impl FeederHardware,
        sink: &mut impl EventSink,
    ) {
        if !self.motor.is_running() {
            return;
        }
        self.last_motor_active_ms = now;

        // The ceiling applies even while a click is settling.
        if self.motor.should_stop(now) {
            info!("Board: max run time reached");
            self.stop_and_reset(now, StopReason::MaxRunTime, hw, sink);
            return;
        }

        if let Some(since) = self.settle_since_ms {
            if now.wrapping_sub(since) >= self.config.click_settle_delay_ms {
                self.settle_since_ms = None;
            }
            return;
        }

        let before = self.safety.faults();
        match self.load_cell.update(now, hw) {
            Ok(true) => {
                self.safety.record_scale_read(true);
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Board: scale read failed ({e})");
                self.safety.record_scale_read(false);
            }
        }
        self.report_fault_change(before, sink);

        if !self.motor.in_grace_period(now) && self.load_cell.should_stop(now) {
            info!("Board: feed stopped");
            self.stop_and_reset(now, StopReason::FeedStopped, hw, sink);
        }
    }

    /// True when the board should power down now.
    pub fn should_sleep(&self, now: u32) -> bool {
        self.sleep_cause(now).is_some()
    }

    pub fn sleep_cause(&self, now: u32) -> Option<SleepCause> {
        if self.shutdown_requested {
            return Some(SleepCause::UserRequest);
        }
        let timeout = self.config.sleep_timeout_ms;
        let motor_idle = now.wrapping_sub(self.last_motor_active_ms) > timeout;
        let buttons_idle = now.wrapping_sub(self.last_button_active_ms) > timeout;
        (motor_idle && buttons_idle).then_some(SleepCause::Inactivity)
    }

    /// Stop the motor, play the sleep chime, park every line, arm the wake
    /// source and persist the retained state.  Returns what was persisted.
    pub fn prepare_for_sleep(
        &mut self,
        hw: &mut impl FeederHardware,
        sleep: &mut impl SleepPort,
        sink: &mut impl EventSink,
    ) -> RetainedState {
        let now = hw.now_ms();
        self.stop_and_reset(now, StopReason::Shutdown, hw, sink);
        chime::play(hw, Chime::Sleep);
        hw.power_down();
        power::prepare(sleep, self.retained);
        info!(
            "Board: sleep prepared (retained {:.2} V)",
            self.retained.motor_voltage
        );
        self.retained
    }

    pub fn enter_deep_sleep(
        &mut self,
        hw: &mut impl FeederHardware,
        sleep: &mut impl SleepPort,
        sink: &mut impl EventSink,
    ) -> ! {
        self.prepare_for_sleep(hw, sleep, sink);
        sleep.enter_low_power()
    }

    // ── Accessors ─────────────────────────────────────────────────

    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    pub fn load_cell(&self) -> &LoadCell {
        &self.load_cell
    }

    pub fn button(&self, id: ButtonId) -> &ButtonState {
        match id {
            ButtonId::Up => &self.up,
            ButtonId::Down => &self.down,
        }
    }

    pub fn retained(&self) -> RetainedState {
        self.retained
    }

    pub fn first_resume_after_wake(&self) -> bool {
        self.first_resume_after_wake
    }

    pub fn is_settling(&self) -> bool {
        self.settle_since_ms.is_some()
    }

    pub fn faults(&self) -> u8 {
        self.safety.faults()
    }

    // ── Internal ──────────────────────────────────────────────────

    fn button_mut(&mut self, id: ButtonId) -> &mut ButtonState {
        match id {
            ButtonId::Up => &mut self.up,
            ButtonId::Down => &mut self.down,
        }
    }

    /// Voltage for an up-click: the retained one on the first click after a
    /// wake (clamped to the run range), otherwise the minimum.
    fn resume_voltage(&mut self) -> f32 {
        if self.first_resume_after_wake {
            self.first_resume_after_wake = false;
            self.retained
                .motor_voltage
                .clamp(self.motor.min_voltage(), self.motor.max_voltage())
        } else {
            self.motor.min_voltage()
        }
    }

    fn start_run(&mut self, target: f32, now: u32, hw: &mut impl FeederHardware) {
        self.motor.set_voltage(target, true, now, hw);
        self.load_cell.reset();
        self.settle_since_ms = Some(now);
        self.last_motor_active_ms = now;
    }

    /// Persist the voltage, zero the motor and clear the detector.  No-op
    /// when the motor is already idle.
    fn stop_and_reset(
        &mut self,
        now: u32,
        reason: StopReason,
        hw: &mut impl FeederHardware,
        sink: &mut impl EventSink,
    ) {
        if !self.motor.is_running() {
            return;
        }
        let voltage = self.motor.voltage();
        let run_ms = self.motor.run_time_ms(now).unwrap_or(0);
        self.retained.motor_voltage = voltage;
        self.motor.reset(now, hw);
        self.load_cell.reset();
        self.settle_since_ms = None;
        self.last_motor_active_ms = now;
        sink.emit(&AppEvent::MotorStopped {
            reason,
            voltage,
            run_ms,
        });
    }

    /// One sample; the level is derived from that same percentage.
    fn read_battery(&self, hw: &mut impl FeederHardware) -> (u8, BatteryLevel) {
        let percent = hw.percentage();
        (percent, self.battery.level_for(percent))
    }

    fn check_battery(
        &mut self,
        now: u32,
        hw: &mut impl FeederHardware,
        sink: &mut impl EventSink,
    ) {
        let (percent, level) = self.read_battery(hw);
        let before = self.safety.faults();
        self.safety.evaluate_battery(level, now);
        sink.emit(&AppEvent::BatteryReport { percent, level });
        self.report_fault_change(before, sink);
    }

    fn report_fault_change(&self, before: u8, sink: &mut impl EventSink) {
        let after = self.safety.faults();
        if after & !before != 0 {
            sink.emit(&AppEvent::FaultDetected(after));
        } else if after == 0 && before != 0 {
            sink.emit(&AppEvent::FaultCleared);
        }
    }
}
