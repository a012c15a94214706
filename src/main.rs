//! Feeder firmware: main entry point.
//!
//! Hexagonal architecture with a single cooperative control loop and deep
//! sleep between feeding sessions.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter             LogEventSink      EspSleep        │
//! │  (Input+Motor+Scale+         (EventSink)       (SleepPort)     │
//! │   Battery+Speaker+Clock)                                       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │                Board (pure logic)                      │    │
//! │  │  Gestures · Motor · LoadCell · Safety                  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  power (wake reason · RTC retained state · pin sequencing)     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use esp_idf_svc::hal::gpio::{PinDriver, Pull};
use esp_idf_svc::hal::peripherals::Peripherals;
use log::{error, info};

use feeder::adapters::hardware::HardwareAdapter;
use feeder::adapters::log_sink::LogEventSink;
use feeder::app::board::{Board, TickOutcome};
use feeder::app::ports::InputPort;
use feeder::config;
use feeder::drivers::button::DebouncedButton;
use feeder::drivers::hw_init;
use feeder::drivers::hx711::Hx711;
use feeder::power::{self, EspSleep};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Feeder v{}                          ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config + wake reason ───────────────────────────────
    let config = config::load();

    let wake = power::wake_reason();
    power::log_wake_reason(wake);
    let retained = power::load_retained().filter(|_| wake.is_wake_from_sleep());

    // Lines held through the last sleep must be released before they
    // can be driven again.
    let mut sleep = EspSleep;
    power::release_holds(&mut sleep);

    // ── 3. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals(config.motor_pwm_freq_hz) {
        error!("HAL init failed: {}", e);
        return Err(e.into());
    }

    let p = Peripherals::take()?;

    // GPIO numbers below mirror `feeder::pins`.
    let mut up_pin = PinDriver::input(p.pins.gpio5)?;
    up_pin.set_pull(Pull::Down)?;
    let mut down_pin = PinDriver::input(p.pins.gpio6)?;
    down_pin.set_pull(Pull::Down)?;

    let scale = Hx711::new(
        PinDriver::input(p.pins.gpio9)?,
        PinDriver::output(p.pins.gpio8)?,
        Ets,
        config.scale_calibration_factor,
    );

    let mut hw = HardwareAdapter::new(
        &config,
        DebouncedButton::new(up_pin, config.button_debounce_ms, config.button_hold_threshold_ms),
        DebouncedButton::new(
            down_pin,
            config.button_debounce_ms,
            config.button_hold_threshold_ms,
        ),
        scale,
    );
    let mut sink = LogEventSink::new();

    // ── 4. Wait for the wake press to end ─────────────────────
    // The finger that woke the board must not register as a click.
    while hw.any_pressed() {
        FreeRtos::delay_ms(config.control_loop_interval_ms);
    }

    // ── 5. Board ──────────────────────────────────────────────
    let mut board = Board::new(config.clone(), retained);
    board.start(&mut hw, &mut sink);

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        if let TickOutcome::Sleep(cause) = board.tick(&mut hw, &mut sink) {
            info!("Entering deep sleep ({:?})", cause);
            board.enter_deep_sleep(&mut hw, &mut sleep, &mut sink);
        }
        FreeRtos::delay_ms(config.control_loop_interval_ms);
    }
}
