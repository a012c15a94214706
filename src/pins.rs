//! GPIO / peripheral pin assignments for the feeder main board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.
//!
//! Numbers are ESP32-S3 GPIO numbers; they do **not** match the `Dn`
//! silkscreen callouts on the XIAO board.

// ---------------------------------------------------------------------------
// Motor driver (two-line H-bridge)
// ---------------------------------------------------------------------------

/// PWM drive line.  Swap with [`MOTOR_IN2_GPIO`] if the motor runs in reverse.
pub const MOTOR_IN1_GPIO: i32 = 44;
/// Held low while feeding; also held low through deep sleep.
pub const MOTOR_IN2_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Buttons (active-high, external pull-down)
// ---------------------------------------------------------------------------

/// Up button, silkscreen D4.  The only RTC-capable wake source.
pub const BUTTON_UP_GPIO: i32 = 5;
/// Down button, silkscreen D5.
pub const BUTTON_DOWN_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// HX711 load-cell amplifier
// ---------------------------------------------------------------------------

/// Serial data out, silkscreen D10.
pub const HX711_DOUT_GPIO: i32 = 9;
/// Serial clock, silkscreen D9.  Held high during deep sleep so the
/// amplifier stays in its power-down mode.
pub const HX711_SCK_GPIO: i32 = 8;

// ---------------------------------------------------------------------------
// Battery sense (22 kΩ / 10 kΩ divider into ADC1)
// ---------------------------------------------------------------------------

/// ADC1 channel 0 (GPIO 1 on ESP32-S3).
pub const BATTERY_ADC_GPIO: i32 = 1;

// ---------------------------------------------------------------------------
// Piezo buzzer (boards without motor-as-speaker)
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  8-bit gives 0..=255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// Default buzzer carrier before the first tone is requested.
pub const BUZZER_PWM_FREQ_HZ: u32 = 2_000;
