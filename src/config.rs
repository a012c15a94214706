//! Feeder configuration parameters
//!
//! All tunable parameters for the feeder.  Defaults match the production
//! board; a JSON override can be baked in at build time through the
//! `FEEDER_CONFIG_JSON` environment variable (see [`load`]).

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Number of weight samples in the load-cell rolling window.
pub const WEIGHT_WINDOW_LEN: usize = 10;

/// Which transducer plays chimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerKind {
    /// Dedicated piezo on [`BUZZER_GPIO`](crate::pins::BUZZER_GPIO).
    Buzzer,
    /// The feed motor itself, driven at audio frequency and low voltage.
    Motor,
}

/// Core feeder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeederConfig {
    // --- Motor ---
    /// Lowest voltage the motor is driven at while running (V)
    pub motor_min_voltage: f32,
    /// Full-scale voltage; maps to 100 % duty (V)
    pub motor_max_voltage: f32,
    /// Ramp increment per hold step (V)
    pub motor_voltage_step: f32,
    /// Minimum spacing between throttled voltage writes (ms)
    pub motor_update_interval_ms: u32,
    /// H-bridge PWM carrier (Hz)
    pub motor_pwm_freq_hz: u32,
    /// Grace period before a feed-stop verdict is honoured (ms)
    pub motor_min_run_time_ms: u32,
    /// Hard ceiling on a single run (ms)
    pub motor_max_run_time_ms: u32,

    // --- Scale ---
    /// HX711 counts per gram
    pub scale_calibration_factor: f32,
    /// Readings averaged when taring
    pub scale_tare_samples: u8,

    // --- Feed-stop detection ---
    /// Load-cell sampling period while feeding (ms)
    pub feed_sample_interval_ms: u32,
    /// EMA weight of the newest rate sample (0–1)
    pub feed_rate_alpha: f32,
    /// Window spread below which weight counts as stable (g)
    pub weight_change_threshold_g: f32,
    /// Smoothed rate below which feeding counts as stopped (g/s)
    pub feed_rate_threshold_g_per_s: f32,
    /// How long a single stop condition must persist (ms)
    pub stop_hold_time_ms: u32,

    // --- Buttons ---
    pub button_debounce_ms: u32,
    /// Press duration that turns a press into a hold (ms)
    pub button_hold_threshold_ms: u32,
    /// Window in which a second click makes a double-click (ms)
    pub double_click_interval_ms: u32,
    /// Load-cell settling time after a click start (ms)
    pub click_settle_delay_ms: u32,

    // --- Timing ---
    /// Idle time before deep sleep (ms)
    pub sleep_timeout_ms: u32,
    /// Control loop interval (ms)
    pub control_loop_interval_ms: u32,
    /// Battery re-check period while awake (ms)
    pub battery_check_interval_ms: u32,

    // --- Battery ---
    /// Warning chime below this charge (%)
    pub battery_warning_percent: u8,
    /// Forced shutdown below this charge (%)
    pub battery_critical_percent: u8,
    /// Boundary between the Medium and High chimes (%)
    pub battery_moderate_percent: u8,

    // --- Audio ---
    pub speaker: SpeakerKind,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            // Motor
            motor_min_voltage: 2.5,
            motor_max_voltage: 3.3,
            motor_voltage_step: 0.1,
            motor_update_interval_ms: 500,
            motor_pwm_freq_hz: 20_000,
            motor_min_run_time_ms: 5_000,
            motor_max_run_time_ms: 60_000,

            // Scale
            scale_calibration_factor: 300.0,
            scale_tare_samples: 10,

            // Feed-stop detection
            feed_sample_interval_ms: 500, // 2 Hz
            feed_rate_alpha: 0.3,
            weight_change_threshold_g: 0.5,
            feed_rate_threshold_g_per_s: 0.2,
            stop_hold_time_ms: 2_000,

            // Buttons
            button_debounce_ms: 50,
            button_hold_threshold_ms: 1_000,
            double_click_interval_ms: 400,
            click_settle_delay_ms: 1_000,

            // Timing
            sleep_timeout_ms: 30_000,
            control_loop_interval_ms: 10, // 100 Hz
            battery_check_interval_ms: 60_000,

            // Battery
            battery_warning_percent: 20,
            battery_critical_percent: 7,
            battery_moderate_percent: 50,

            speaker: SpeakerKind::Motor,
        }
    }
}

impl FeederConfig {
    /// Grace period actually applied to a run: long enough for the
    /// load-cell window to fill at least once.
    pub fn effective_min_run_time_ms(&self) -> u32 {
        let fill = self
            .feed_sample_interval_ms
            .saturating_mul(WEIGHT_WINDOW_LEN as u32);
        self.motor_min_run_time_ms.max(fill)
    }

    /// Parse and validate a JSON document.  Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1.0..=5.0).contains(&self.motor_max_voltage) {
            return Err(ConfigError::ValidationFailed(
                "motor_max_voltage must be 1.0–5.0",
            ));
        }
        if !(self.motor_min_voltage > 0.0 && self.motor_min_voltage <= self.motor_max_voltage) {
            return Err(ConfigError::ValidationFailed(
                "motor_min_voltage must be > 0 and <= motor_max_voltage",
            ));
        }
        if !(0.01..=1.0).contains(&self.motor_voltage_step) {
            return Err(ConfigError::ValidationFailed(
                "motor_voltage_step must be 0.01–1.0",
            ));
        }
        if !(10..=5_000).contains(&self.motor_update_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "motor_update_interval_ms must be 10–5000",
            ));
        }
        if !(1_000..=40_000).contains(&self.motor_pwm_freq_hz) {
            return Err(ConfigError::ValidationFailed(
                "motor_pwm_freq_hz must be 1000–40000",
            ));
        }
        if self.motor_min_run_time_ms >= self.motor_max_run_time_ms {
            return Err(ConfigError::ValidationFailed(
                "motor_min_run_time_ms must be < motor_max_run_time_ms",
            ));
        }
        if !(1_000..=600_000).contains(&self.motor_max_run_time_ms) {
            return Err(ConfigError::ValidationFailed(
                "motor_max_run_time_ms must be 1000–600000",
            ));
        }
        if self.effective_min_run_time_ms() >= self.motor_max_run_time_ms {
            return Err(ConfigError::ValidationFailed(
                "load-cell window must fill before motor_max_run_time_ms",
            ));
        }
        if !(self.scale_calibration_factor.is_finite() && self.scale_calibration_factor != 0.0) {
            return Err(ConfigError::ValidationFailed(
                "scale_calibration_factor must be finite and non-zero",
            ));
        }
        if self.scale_tare_samples == 0 {
            return Err(ConfigError::ValidationFailed(
                "scale_tare_samples must be >= 1",
            ));
        }
        if !(50..=10_000).contains(&self.feed_sample_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "feed_sample_interval_ms must be 50–10000",
            ));
        }
        if !(self.feed_rate_alpha > 0.0 && self.feed_rate_alpha <= 1.0) {
            return Err(ConfigError::ValidationFailed(
                "feed_rate_alpha must be in (0, 1]",
            ));
        }
        if !(self.weight_change_threshold_g > 0.0 && self.weight_change_threshold_g.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "weight_change_threshold_g must be > 0",
            ));
        }
        if !(self.feed_rate_threshold_g_per_s > 0.0 && self.feed_rate_threshold_g_per_s.is_finite())
        {
            return Err(ConfigError::ValidationFailed(
                "feed_rate_threshold_g_per_s must be > 0",
            ));
        }
        if self.button_debounce_ms >= self.button_hold_threshold_ms {
            return Err(ConfigError::ValidationFailed(
                "button_debounce_ms must be < button_hold_threshold_ms",
            ));
        }
        if !(100..=2_000).contains(&self.double_click_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "double_click_interval_ms must be 100–2000",
            ));
        }
        if !(1..=1_000).contains(&self.control_loop_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "control_loop_interval_ms must be 1–1000",
            ));
        }
        if self.sleep_timeout_ms < 5_000 {
            return Err(ConfigError::ValidationFailed(
                "sleep_timeout_ms must be >= 5000",
            ));
        }
        if self.battery_critical_percent >= self.battery_warning_percent
            || self.battery_warning_percent >= self.battery_moderate_percent
            || self.battery_moderate_percent > 100
        {
            return Err(ConfigError::ValidationFailed(
                "battery thresholds must satisfy critical < warning < moderate <= 100",
            ));
        }
        Ok(())
    }
}

/// Resolve the configuration for this build.
///
/// Uses `FEEDER_CONFIG_JSON` when it was set at compile time and validates;
/// otherwise falls back to [`FeederConfig::default`].
pub fn load() -> FeederConfig {
    match option_env!("FEEDER_CONFIG_JSON") {
        Some(json) => match FeederConfig::from_json(json) {
            Ok(cfg) => {
                info!("Config: using build-time override");
                cfg
            }
            Err(e) => {
                warn!("Config override rejected ({e}), using defaults");
                FeederConfig::default()
            }
        },
        None => FeederConfig::default(),
    }
}
