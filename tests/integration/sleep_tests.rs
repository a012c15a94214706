//! Deep-sleep integration tests: shutdown gesture, pin sequencing, wake
//! source and the retained voltage across a simulated power cycle.

use crate::mock_hw::{HwCall, MockSleep, Rig, SleepCall};
use feeder::app::board::{Board, TickOutcome};
use feeder::app::events::SleepCause;
use feeder::app::ports::{PinConfig, SleepPort, WakeLevel};
use feeder::buttons::ButtonId;
use feeder::config::FeederConfig;
use feeder::pins;
use feeder::power::{self, EspSleep, RetainedState};

#[test]
fn down_double_click_requests_sleep_immediately() {
    let mut rig = Rig::started(FeederConfig::default(), None);
    assert_eq!(
        rig.double_click(ButtonId::Down),
        TickOutcome::Sleep(SleepCause::UserRequest)
    );
}

#[test]
fn shutdown_gesture_while_running_stops_before_sleeping() {
    let mut rig = Rig::started(FeederConfig::default(), None);
    rig.hw.grams_per_read = 1.0;
    rig.click(ButtonId::Up);
    rig.run_for(1_000);
    assert!(rig.board.motor().is_running());

    rig.double_click(ButtonId::Down);
    let mut sleep = MockSleep::default();
    let stored = rig
        .board
        .prepare_for_sleep(&mut rig.hw, &mut sleep, &mut rig.sink);
    assert!(!rig.board.motor().is_running());
    assert_eq!(stored.motor_voltage, 2.5);
    assert_eq!(sleep.stored(), Some(RetainedState { motor_voltage: 2.5 }));
}

#[test]
fn prepare_for_sleep_parks_lines_in_order() {
    let mut rig = Rig::started(FeederConfig::default(), None);
    rig.double_click(ButtonId::Up);
    rig.click(ButtonId::Down);
    rig.hw.clear_calls();

    let mut sleep = MockSleep::default();
    let stored = rig
        .board
        .prepare_for_sleep(&mut rig.hw, &mut sleep, &mut rig.sink);
    assert_eq!(stored.motor_voltage, 3.3);

    // Sleep chime, then the amplifier is powered down.
    assert_eq!(rig.hw.tones(), vec![1800, 1400, 1000, 600]);
    assert_eq!(rig.hw.calls.last(), Some(&HwCall::ScalePowerDown));

    let at = |c: SleepCall| {
        sleep
            .position(&c)
            .unwrap_or_else(|| panic!("missing {c:?}"))
    };
    let sck = at(SleepCall::HoldEnable(pins::HX711_SCK_GPIO));
    let in1 = at(SleepCall::Configure(pins::MOTOR_IN1_GPIO, PinConfig::OutputLow));
    let in2 = at(SleepCall::HoldEnable(pins::MOTOR_IN2_GPIO));
    let down = at(SleepCall::Configure(
        pins::BUTTON_DOWN_GPIO,
        PinConfig::InputPullDown,
    ));
    let wake = at(SleepCall::ArmWake(pins::BUTTON_UP_GPIO, WakeLevel::High));
    let store = at(SleepCall::Store(RetainedState { motor_voltage: 3.3 }));
    assert!(sck < in1 && in1 < in2 && in2 < down && down < wake && wake < store);
    assert_eq!(store, sleep.calls.len() - 1);

    let wakes = sleep
        .calls
        .iter()
        .filter(|c| matches!(c, SleepCall::ArmWake(..)))
        .count();
    assert_eq!(wakes, 1, "exactly one wake source");
}

#[test]
fn sleep_without_any_run_keeps_zero_voltage() {
    let mut rig = Rig::started(FeederConfig::default(), None);
    let mut sleep = MockSleep::default();
    let stored = rig
        .board
        .prepare_for_sleep(&mut rig.hw, &mut sleep, &mut rig.sink);
    assert_eq!(stored.motor_voltage, 0.0);
    // Idle stop writes nothing new to the bridge.
    assert_eq!(rig.hw.count(&HwCall::Duty(feeder::app::ports::MotorLine::In1, 0)), 1);
}

#[test]
fn boot_releases_every_latched_pin() {
    let mut sleep = MockSleep::default();
    power::release_holds(&mut sleep);
    for pin in [
        pins::HX711_SCK_GPIO,
        pins::MOTOR_IN1_GPIO,
        pins::MOTOR_IN2_GPIO,
        pins::BUZZER_GPIO,
    ] {
        assert!(sleep.position(&SleepCall::HoldDisable(pin)).is_some());
    }
}

#[test]
fn retained_voltage_survives_a_power_cycle() {
    // First session: run at full voltage, stop, go to sleep.
    let mut rig = Rig::started(FeederConfig::default(), None);
    rig.double_click(ButtonId::Up);
    rig.click(ButtonId::Down);
    let state = rig
        .board
        .prepare_for_sleep(&mut rig.hw, &mut MockSleep::default(), &mut rig.sink);

    // Host sleep controller writes the RTC record.
    EspSleep.store_retained(state);

    // Second session.
    let retained = power::load_retained();
    assert_eq!(retained, Some(RetainedState { motor_voltage: 3.3 }));
    let mut rig = Rig::started(FeederConfig::default(), retained);
    assert!(rig.board.first_resume_after_wake());
    rig.click(ButtonId::Up);
    assert_eq!(rig.board.motor().voltage(), 3.3);
    assert!(!rig.board.first_resume_after_wake());

    // Record is consumed.
    assert_eq!(power::load_retained(), None);
    let fresh = Board::new(FeederConfig::default(), power::load_retained());
    assert!(!fresh.first_resume_after_wake());
}
