//! Deep-sleep lifecycle: wake reason, retained state, pin sequencing.
//!
//! ## Retained state
//!
//! Only the last motor voltage survives a power-down.  It lives in RTC slow
//! memory (`.rtc.data`, not re-initialised on a deep-sleep wake) as raw `f32`
//! bits next to a magic word.  [`load_retained`] consumes the record, so it
//! is handed to the board exactly once per wake.
//!
//! ## Shutdown sequencing
//!
//! Before sleeping every controlled line is parked in a fixed order
//! ([`SHUTDOWN_SEQUENCE`]):
//!
//! 1. HX711 clock driven high and held (amplifier stays powered down),
//! 2. motor bridge inputs driven low and held,
//! 3. down button left as input with pull-down so it does not float,
//! 4. buzzer pin isolated.
//!
//! The up button is then armed as the single (ext0, level-high) wake source.

use core::sync::atomic::{AtomicU32, Ordering};

use log::{info, warn};

use crate::app::ports::{PinConfig, SleepPort, WakeLevel};
use crate::pins;

// ---------------------------------------------------------------------------
// Wake reason
// ---------------------------------------------------------------------------

/// Why the chip is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// Cold boot or reset; not a wake from deep sleep.
    PowerOn,
    /// Up-button ext0 wake.
    Button,
    Timer,
    /// Any other wake source.  Logged, otherwise treated like a button wake.
    Other(u32),
}

impl WakeReason {
    pub fn is_wake_from_sleep(self) -> bool {
        !matches!(self, Self::PowerOn)
    }
}

#[cfg(target_os = "espidf")]
pub fn wake_reason() -> WakeReason {
    use esp_idf_svc::sys::*;
    // SAFETY: read-only query of the RTC controller's latched wake cause.
    let cause = unsafe { esp_sleep_get_wakeup_cause() };
    match cause {
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED => WakeReason::PowerOn,
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT0 => WakeReason::Button,
        esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER => WakeReason::Timer,
        other => WakeReason::Other(other),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn wake_reason() -> WakeReason {
    WakeReason::PowerOn
}

/// Log the wake cause.  Never fatal.
pub fn log_wake_reason(reason: WakeReason) {
    match reason {
        WakeReason::PowerOn => info!("Power: cold boot"),
        WakeReason::Button => info!("Power: woke on up-button"),
        WakeReason::Timer => warn!("Power: woke on timer (no timer armed)"),
        WakeReason::Other(code) => warn!("Power: unexpected wake cause {code}"),
    }
}

// ---------------------------------------------------------------------------
// Retained state
// ---------------------------------------------------------------------------

/// State that must survive a deep-sleep cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetainedState {
    /// Voltage of the last run (V); `0.0` if there was none.
    pub motor_voltage: f32,
}

const RETAINED_MAGIC: u32 = 0xFEED_5EED;

#[cfg_attr(target_os = "espidf", unsafe(link_section = ".rtc.data"))]
static RTC_MAGIC: AtomicU32 = AtomicU32::new(0);

#[cfg_attr(target_os = "espidf", unsafe(link_section = ".rtc.data"))]
static RTC_MOTOR_VOLTAGE: AtomicU32 = AtomicU32::new(0);

/// Write the retained record.  Call immediately before sleeping.
pub fn store_retained(state: RetainedState) {
    RTC_MOTOR_VOLTAGE.store(state.motor_voltage.to_bits(), Ordering::Relaxed);
    RTC_MAGIC.store(RETAINED_MAGIC, Ordering::Release);
}

/// Read and invalidate the retained record.
///
/// Returns `None` after a cold boot (RTC memory not yet written), after a
/// previous call, or when the stored voltage is not a finite, non-negative
/// number.
pub fn load_retained() -> Option<RetainedState> {
    if RTC_MAGIC.swap(0, Ordering::Acquire) != RETAINED_MAGIC {
        return None;
    }
    let v = f32::from_bits(RTC_MOTOR_VOLTAGE.load(Ordering::Relaxed));
    if !v.is_finite() || v < 0.0 {
        warn!("Power: discarding corrupt retained voltage");
        return None;
    }
    Some(RetainedState { motor_voltage: v })
}

// ---------------------------------------------------------------------------
// Pin sequencing
// ---------------------------------------------------------------------------

/// One step of the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinAction {
    HoldDisable(i32),
    Configure(i32, PinConfig),
    HoldEnable(i32),
    Isolate(i32),
}

pub const SHUTDOWN_SEQUENCE: &[PinAction] = &[
    // HX711 into power-down: SCK high for > 60 µs, latched.
    PinAction::HoldDisable(pins::HX711_SCK_GPIO),
    PinAction::Configure(pins::HX711_SCK_GPIO, PinConfig::OutputHigh),
    PinAction::HoldEnable(pins::HX711_SCK_GPIO),
    // Motor bridge off.
    PinAction::HoldDisable(pins::MOTOR_IN1_GPIO),
    PinAction::Configure(pins::MOTOR_IN1_GPIO, PinConfig::OutputLow),
    PinAction::HoldEnable(pins::MOTOR_IN1_GPIO),
    PinAction::HoldDisable(pins::MOTOR_IN2_GPIO),
    PinAction::Configure(pins::MOTOR_IN2_GPIO, PinConfig::OutputLow),
    PinAction::HoldEnable(pins::MOTOR_IN2_GPIO),
    // Down button must not float.
    PinAction::Configure(pins::BUTTON_DOWN_GPIO, PinConfig::InputPullDown),
    PinAction::Isolate(pins::BUZZER_GPIO),
];

/// Pins latched or isolated by [`SHUTDOWN_SEQUENCE`]; released again at
/// boot.  Isolation latches the pad too.
pub const HELD_PINS: [i32; 4] = [
    pins::HX711_SCK_GPIO,
    pins::MOTOR_IN1_GPIO,
    pins::MOTOR_IN2_GPIO,
    pins::BUZZER_GPIO,
];

pub fn apply(sleep: &mut impl SleepPort, actions: &[PinAction]) {
    for action in actions {
        match *action {
            PinAction::HoldDisable(pin) => sleep.hold_disable(pin),
            PinAction::Configure(pin, cfg) => sleep.configure(pin, cfg),
            PinAction::HoldEnable(pin) => sleep.hold_enable(pin),
            PinAction::Isolate(pin) => sleep.isolate(pin),
        }
    }
}

/// Undo the sleep-time pin latches so the drivers can take the pins back.
pub fn release_holds(sleep: &mut impl SleepPort) {
    for pin in HELD_PINS {
        sleep.hold_disable(pin);
    }
}

/// Park the pins, arm the up-button wake and persist `state`.  Everything
/// short of the final hand-off.
pub fn prepare(sleep: &mut impl SleepPort, state: RetainedState) {
    apply(sleep, SHUTDOWN_SEQUENCE);
    sleep.configure(pins::BUTTON_UP_GPIO, PinConfig::InputPullDown);
    sleep.arm_wake(pins::BUTTON_UP_GPIO, WakeLevel::High);
    sleep.store_retained(state);
}

// ---------------------------------------------------------------------------
// ESP-IDF sleep controller
// ---------------------------------------------------------------------------

/// [`SleepPort`] over the ESP-IDF GPIO / RTC-IO / sleep APIs.
pub struct EspSleep;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::sys::*;
    use log::{info, warn};

    use super::{EspSleep, RetainedState};
    use crate::app::ports::{PinConfig, SleepPort, WakeLevel};

    fn check(op: &str, pin: i32, ret: esp_err_t) {
        if ret != ESP_OK as esp_err_t {
            warn!("Power: {op}({pin}) failed (rc={ret})");
        }
    }

    impl SleepPort for EspSleep {
        fn configure(&mut self, pin: i32, config: PinConfig) {
            let (mode, pull_down, level) = match config {
                PinConfig::OutputLow => (gpio_mode_t_GPIO_MODE_OUTPUT, false, 0),
                PinConfig::OutputHigh => (gpio_mode_t_GPIO_MODE_OUTPUT, false, 1),
                PinConfig::InputPullDown => (gpio_mode_t_GPIO_MODE_INPUT, true, 0),
            };
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << pin,
                mode,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
                pull_down_en: if pull_down {
                    gpio_pulldown_t_GPIO_PULLDOWN_ENABLE
                } else {
                    gpio_pulldown_t_GPIO_PULLDOWN_DISABLE
                },
                intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
            };
            // SAFETY: single-threaded shutdown path; pin numbers come from `pins`.
            unsafe {
                check("gpio_config", pin, gpio_config(&cfg));
                if mode == gpio_mode_t_GPIO_MODE_OUTPUT {
                    check("gpio_set_level", pin, gpio_set_level(pin, level));
                }
            }
        }

        fn hold_enable(&mut self, pin: i32) {
            // SAFETY: latch register write on a configured pin.
            check("gpio_hold_en", pin, unsafe { gpio_hold_en(pin) });
        }

        fn hold_disable(&mut self, pin: i32) {
            // SAFETY: latch and mux register writes; harmless on an
            // unlatched digital pin.
            unsafe {
                check("gpio_hold_dis", pin, gpio_hold_dis(pin));
                // An isolated pad stays routed to the RTC domain.
                if rtc_gpio_is_valid_gpio(pin) {
                    check("rtc_gpio_deinit", pin, rtc_gpio_deinit(pin));
                }
            }
        }

        fn isolate(&mut self, pin: i32) {
            // SAFETY: only RTC-capable pads can be isolated; others are skipped.
            unsafe {
                if rtc_gpio_is_valid_gpio(pin) {
                    check("rtc_gpio_isolate", pin, rtc_gpio_isolate(pin));
                }
            }
        }

        fn arm_wake(&mut self, pin: i32, level: WakeLevel) {
            let lvl = match level {
                WakeLevel::Low => 0,
                WakeLevel::High => 1,
            };
            // SAFETY: ext0 needs an RTC-capable pad; the pulls keep it at
            // the inactive level while the digital domain is off.
            unsafe {
                check("ext0_wakeup", pin, esp_sleep_enable_ext0_wakeup(pin, lvl));
                if lvl == 1 {
                    check("rtc_pullup_dis", pin, rtc_gpio_pullup_dis(pin));
                    check("rtc_pulldown_en", pin, rtc_gpio_pulldown_en(pin));
                } else {
                    check("rtc_pulldown_dis", pin, rtc_gpio_pulldown_dis(pin));
                    check("rtc_pullup_en", pin, rtc_gpio_pullup_en(pin));
                }
            }
        }

        fn store_retained(&mut self, state: RetainedState) {
            super::store_retained(state);
        }

        fn enter_low_power(&mut self) -> ! {
            info!("Power: entering deep sleep");
            // SAFETY: every line has been parked; nothing runs after this.
            unsafe {
                gpio_deep_sleep_hold_en();
                esp_deep_sleep_start()
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SleepPort for EspSleep {
    fn configure(&mut self, _pin: i32, _config: PinConfig) {}
    fn hold_enable(&mut self, _pin: i32) {}
    fn hold_disable(&mut self, _pin: i32) {}
    fn isolate(&mut self, _pin: i32) {}
    fn arm_wake(&mut self, _pin: i32, _level: WakeLevel) {}

    fn store_retained(&mut self, state: RetainedState) {
        store_retained(state);
    }

    fn enter_low_power(&mut self) -> ! {
        info!("Power(sim): deep sleep, exiting");
        std::process::exit(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RTC statics are process-global; keep every retained-state assertion in
    // one test so parallel tests cannot interleave.
    #[test]
    fn retained_state_is_consumed_once() {
        assert_eq!(load_retained(), None);
        store_retained(RetainedState { motor_voltage: 2.9 });
        assert_eq!(load_retained(), Some(RetainedState { motor_voltage: 2.9 }));
        assert_eq!(load_retained(), None);

        store_retained(RetainedState {
            motor_voltage: f32::NAN,
        });
        assert_eq!(load_retained(), None);
    }

    #[test]
    fn shutdown_parks_sck_before_motor_before_button() {
        let pos = |a: PinAction| SHUTDOWN_SEQUENCE.iter().position(|x| *x == a);
        let sck = pos(PinAction::HoldEnable(pins::HX711_SCK_GPIO)).unwrap();
        let in1 = pos(PinAction::Configure(pins::MOTOR_IN1_GPIO, PinConfig::OutputLow)).unwrap();
        let in2 = pos(PinAction::HoldEnable(pins::MOTOR_IN2_GPIO)).unwrap();
        let down = pos(PinAction::Configure(
            pins::BUTTON_DOWN_GPIO,
            PinConfig::InputPullDown,
        ))
        .unwrap();
        assert!(sck < in1 && in1 < in2 && in2 < down);
    }

    #[test]
    fn every_held_pin_is_released() {
        for action in SHUTDOWN_SEQUENCE {
            if let PinAction::HoldEnable(pin) | PinAction::Isolate(pin) = action {
                assert!(HELD_PINS.contains(pin), "pin {pin} stays latched");
            }
        }
    }

    #[test]
    fn isolated_buzzer_is_released() {
        assert!(SHUTDOWN_SEQUENCE.contains(&PinAction::Isolate(pins::BUZZER_GPIO)));
        assert!(HELD_PINS.contains(&pins::BUZZER_GPIO));
    }

    #[test]
    fn only_cold_boot_is_not_a_wake() {
        assert!(!WakeReason::PowerOn.is_wake_from_sleep());
        assert!(WakeReason::Button.is_wake_from_sleep());
        assert!(WakeReason::Other(9).is_wake_from_sleep());
    }
}
