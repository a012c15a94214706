//! Board integration tests: gestures, feeding cycle, run-time bounds and
//! battery protection, driven tick by tick against the mock adapters.

use crate::mock_hw::{HwCall, Rig};
use feeder::app::board::TickOutcome;
use feeder::app::events::{AppEvent, SleepCause, StopReason};
use feeder::app::ports::{MotorLine, RawEdge};
use feeder::buttons::{ButtonId, ButtonStatus};
use feeder::config::{FeederConfig, WEIGHT_WINDOW_LEN};
use feeder::error::SafetyFault;
use feeder::power::RetainedState;
use feeder::sensors::battery::BatteryLevel;

fn last_stop(rig: &Rig) -> (StopReason, f32, u32) {
    match rig.motor_stops().last() {
        Some(AppEvent::MotorStopped {
            reason,
            voltage,
            run_ms,
        }) => (*reason, *voltage, *run_ms),
        _ => panic!("no MotorStopped event"),
    }
}

fn started() -> Rig {
    Rig::started(FeederConfig::default(), None)
}

#[test]
fn boot_parks_motor_and_plays_startup_chime() {
    let rig = started();
    assert_eq!(rig.hw.last_duty(MotorLine::In1), Some(0));
    assert_eq!(rig.hw.last_duty(MotorLine::In2), Some(0));
    assert_eq!(rig.hw.tones(), vec![1000, 1300, 1600, 2000]);
    assert_eq!(rig.hw.count(&HwCall::ScalePowerUp), 1);
    assert_eq!(rig.hw.battery_reads, 1);
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::Started {
            resumed_from_sleep: false
        }
    )));
}

#[test]
fn up_click_starts_at_minimum_after_double_click_window() {
    let mut rig = started();
    rig.tap(ButtonId::Up);
    assert!(!rig.board.motor().is_running(), "lone click must wait");
    rig.run_for(450);
    assert!(rig.board.motor().is_running());
    assert_eq!(rig.board.motor().voltage(), 2.5);
    // 2.5 / 3.3 * 255 = 193.18
    assert_eq!(rig.hw.last_duty(MotorLine::In1), Some(193));
    assert!(
        rig.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::MotorStarted { voltage } if *voltage == 2.5))
    );
}

#[test]
fn first_click_after_wake_resumes_retained_voltage_once() {
    let mut rig = Rig::started(
        FeederConfig::default(),
        Some(RetainedState { motor_voltage: 2.9 }),
    );
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::Started {
            resumed_from_sleep: true
        }
    )));

    rig.click(ButtonId::Up);
    assert_eq!(rig.board.motor().voltage(), 2.9);

    rig.click(ButtonId::Down);
    assert!(!rig.board.motor().is_running());

    rig.click(ButtonId::Up);
    assert_eq!(rig.board.motor().voltage(), 2.5);
}

#[test]
fn up_double_click_starts_at_maximum() {
    let mut rig = started();
    rig.double_click(ButtonId::Up);
    assert_eq!(rig.board.motor().voltage(), 3.3);
    assert_eq!(rig.hw.last_duty(MotorLine::In1), Some(255));
}

#[test]
fn down_click_stops_a_running_motor() {
    let mut rig = started();
    rig.hw.grams_per_read = 1.0;
    rig.click(ButtonId::Up);
    rig.run_for(2_000);

    rig.click(ButtonId::Down);
    assert!(!rig.board.motor().is_running());
    assert_eq!(rig.hw.last_duty(MotorLine::In1), Some(0));
    let (reason, voltage, _) = last_stop(&rig);
    assert_eq!(reason, StopReason::UserStop);
    assert_eq!(voltage, 2.5);
    assert_eq!(rig.board.retained().motor_voltage, 2.5);
}

#[test]
fn down_click_when_idle_plays_battery_chime() {
    let mut rig = started();
    rig.hw.battery_percent = 35;
    rig.hw.battery_reads = 0;
    rig.hw.clear_calls();
    rig.click(ButtonId::Down);

    // Percent and level come from the same sample.
    assert_eq!(rig.hw.battery_reads, 1);

    // Medium: two beeps around a rest.
    assert_eq!(rig.hw.tones(), vec![1500, 0, 1500]);
    assert!(matches!(
        rig.sink.events.last(),
        Some(AppEvent::BatteryReport {
            percent: 35,
            level: BatteryLevel::Medium
        })
    ));
}

#[test]
fn up_hold_ramps_from_minimum_in_throttled_steps() {
    let mut rig = started();
    rig.hw.grams_per_read = 1.0;
    rig.hw.queue_edge(ButtonId::Up, RawEdge::Pressed);
    rig.tick();
    rig.hw.queue_edge(ButtonId::Up, RawEdge::Held);
    rig.tick();
    // First write only arms the throttle.
    assert!(!rig.board.motor().is_running());

    rig.run_for(1_500);
    let v = rig.board.motor().voltage();
    assert!((2.65..2.75).contains(&v), "got {v}");

    rig.hw.queue_edge(ButtonId::Up, RawEdge::Released);
    rig.run_for(1_000);
    let after = rig.board.motor().voltage();
    assert_eq!(after, v, "release after hold is not a click");
}

#[test]
fn down_hold_ramps_to_minimum_without_stopping() {
    let mut rig = started();
    rig.hw.grams_per_read = 1.0;
    rig.double_click(ButtonId::Up);
    assert_eq!(rig.board.motor().voltage(), 3.3);

    rig.hw.queue_edge(ButtonId::Down, RawEdge::Pressed);
    rig.tick();
    rig.hw.queue_edge(ButtonId::Down, RawEdge::Held);
    rig.run_for(6_000);
    assert!(rig.board.motor().is_running());
    assert!((rig.board.motor().voltage() - 2.5).abs() < 1e-4);

    rig.hw.queue_edge(ButtonId::Down, RawEdge::Released);
    rig.run_for(1_000);
    assert!(rig.board.motor().is_running());
}

#[test]
fn max_run_time_stops_motor_at_exactly_the_ceiling() {
    let mut rig = started();
    rig.hw.grams_per_read = 1.0; // feed keeps flowing
    rig.click(ButtonId::Up);
    assert!(rig.board.motor().is_running());

    let took = rig.run_until(70_000, |r| !r.board.motor().is_running());
    assert!(took.is_some(), "motor never stopped");
    let (reason, _, run_ms) = last_stop(&rig);
    assert_eq!(reason, StopReason::MaxRunTime);
    assert_eq!(run_ms, 60_000);
}

#[test]
fn still_bowl_stops_motor_after_grace_period() {
    let mut rig = started();
    rig.hw.weight = 12.0;
    rig.click(ButtonId::Up);

    rig.run_until(20_000, |r| !r.board.motor().is_running())
        .expect("feed stop never detected");
    let (reason, _, run_ms) = last_stop(&rig);
    assert_eq!(reason, StopReason::FeedStopped);
    let min_run = FeederConfig::default().effective_min_run_time_ms();
    assert!(run_ms >= min_run, "stopped inside grace period ({run_ms} ms)");
    assert!(rig.hw.count(&HwCall::Tare) >= 1);
}

#[test]
fn stall_after_flow_is_detected() {
    let mut rig = started();
    rig.hw.grams_per_read = 1.0;
    rig.click(ButtonId::Up);
    rig.run_for(10_000);
    assert!(rig.board.motor().is_running(), "flowing feed must not stop");

    rig.hw.grams_per_read = 0.0;
    let took = rig
        .run_until(15_000, |r| !r.board.motor().is_running())
        .expect("stall never detected");
    assert!(took <= 8_000, "took {took} ms");
    assert_eq!(last_stop(&rig).0, StopReason::FeedStopped);
}

#[test]
fn up_click_while_running_clears_window_and_settles() {
    let mut rig = started();
    rig.hw.grams_per_read = 1.0;
    rig.click(ButtonId::Up);
    rig.run_until(10_000, |r| {
        r.board.load_cell().sample_count() == WEIGHT_WINDOW_LEN
    })
    .expect("window never filled");
    assert!(rig.board.motor().is_running());

    rig.click(ButtonId::Up);
    assert!(rig.board.motor().is_running());
    assert_eq!(rig.board.motor().voltage(), 2.5);
    assert_eq!(rig.board.load_cell().sample_count(), 0);
    assert_eq!(rig.board.button(ButtonId::Up).status(), ButtonStatus::Idle);
    assert!(rig.board.is_settling());
}

#[test]
fn dead_scale_still_hits_run_time_ceiling() {
    let mut rig = started();
    rig.hw.fail_reads = true;
    rig.click(ButtonId::Up);

    rig.run_until(70_000, |r| !r.board.motor().is_running())
        .expect("motor never stopped");
    assert_eq!(last_stop(&rig).0, StopReason::MaxRunTime);
    assert!(
        rig.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::FaultDetected(f) if f & SafetyFault::ScaleUnresponsive.mask() != 0))
    );
}

#[test]
fn critical_battery_forces_stop_and_sleep() {
    let config = FeederConfig {
        battery_check_interval_ms: 1_000,
        ..FeederConfig::default()
    };
    let mut rig = Rig::started(config, None);
    rig.hw.grams_per_read = 1.0;
    rig.click(ButtonId::Up);
    assert!(rig.board.motor().is_running());

    rig.hw.battery_percent = 5;
    let outcome = rig.run_for(2_000);
    assert_eq!(outcome, TickOutcome::Sleep(SleepCause::BatteryCritical));
    assert!(!rig.board.motor().is_running());
    assert_eq!(last_stop(&rig).0, StopReason::Shutdown);
}

#[test]
fn critical_battery_at_boot_skips_warning_and_sleeps() {
    let mut rig = Rig::new(FeederConfig::default(), None);
    rig.hw.battery_percent = 3;
    rig.board.start(&mut rig.hw, &mut rig.sink);
    assert_eq!(rig.hw.tones(), vec![1000, 1300, 1600, 2000]);
    assert_eq!(rig.tick(), TickOutcome::Sleep(SleepCause::BatteryCritical));
}

#[test]
fn low_battery_warning_plays_once_per_boot() {
    let mut rig = Rig::new(FeederConfig::default(), None);
    rig.hw.battery_percent = 15;
    rig.board.start(&mut rig.hw, &mut rig.sink);
    assert_eq!(rig.hw.tones(), vec![1000, 1300, 1600, 2000, 700, 0, 700]);

    rig.hw.clear_calls();
    rig.run_for(5_000);
    assert!(rig.hw.tones().is_empty());
    assert!(rig.board.faults() & SafetyFault::BatteryLow.mask() != 0);
}

#[test]
fn inactivity_requests_sleep_after_timeout() {
    let mut rig = started();
    assert_eq!(rig.run_for(29_000), TickOutcome::Continue);
    assert_eq!(
        rig.run_for(2_000),
        TickOutcome::Sleep(SleepCause::Inactivity)
    );
}

#[test]
fn running_motor_keeps_board_awake() {
    let mut rig = started();
    rig.hw.grams_per_read = 1.0;
    rig.click(ButtonId::Up);
    assert_eq!(rig.run_for(45_000), TickOutcome::Continue);
    assert!(rig.board.motor().is_running());
}
