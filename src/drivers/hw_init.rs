//! One-shot hardware peripheral initialization.
//!
//! Configures the battery ADC channel and the LEDC timers/channels using
//! raw ESP-IDF sys calls.  Called once from `main()` before the control
//! loop starts.  Buttons and the HX711 lines are owned by `PinDriver`s
//! and are not touched here.
//!
//! ```text
//!   LEDC timer 0 (motor carrier, 8-bit) ── CH0  IN1
//!                                       └─ CH1  IN2
//!   LEDC timer 1 (buzzer, 8-bit)        ── CH2  buzzer
//!   ADC1 CH0 (GPIO1, 12 dB)             ── battery divider
//! ```

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::error::SensorError;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    LedcTimerFailed(i32),
    LedcChannelFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::LedcTimerFailed(rc) => write!(f, "LEDC timer config failed (rc={})", rc),
            Self::LedcChannelFailed(rc) => write!(f, "LEDC channel config failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

pub const LEDC_CH_MOTOR_IN1: u32 = 0;
pub const LEDC_CH_MOTOR_IN2: u32 = 1;
pub const LEDC_CH_BUZZER: u32 = 2;

pub const LEDC_TIMER_MOTOR: u32 = 0;
pub const LEDC_TIMER_BUZZER: u32 = 1;

pub const ADC1_CH_BATTERY: u32 = 0;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(target_os = "espidf")]
pub fn init_peripherals(motor_pwm_hz: u32) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_adc()?;
        init_ledc(motor_pwm_hz)?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(_motor_pwm_hz: u32) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// main-loop ADC read path.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as esp_err_t {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), ADC1_CH_BATTERY, &chan_cfg) };
    if ret != ESP_OK as esp_err_t {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 configured (CH{}=battery, GPIO{})", ADC1_CH_BATTERY, pins::BATTERY_ADC_GPIO);
    Ok(())
}

/// One raw 12-bit sample.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as esp_err_t {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(raw.clamp(0, 4095) as u16)
}

/// Host build reports a full pack.
#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> Result<u16, SensorError> {
    Ok(1_629)
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc(motor_pwm_hz: u32) -> Result<(), HwInitError> {
    let timers = [
        (ledc_timer_t_LEDC_TIMER_0, motor_pwm_hz),
        (ledc_timer_t_LEDC_TIMER_1, pins::BUZZER_PWM_FREQ_HZ),
    ];
    for (timer_num, freq_hz) in timers {
        let cfg = ledc_timer_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            timer_num,
            duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
            freq_hz,
            clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
            ..Default::default()
        };
        // SAFETY: Called from single main-task context via init_peripherals().
        let ret = unsafe { ledc_timer_config(&cfg) };
        if ret != ESP_OK as esp_err_t {
            return Err(HwInitError::LedcTimerFailed(ret));
        }
    }

    let channels = [
        (LEDC_CH_MOTOR_IN1, LEDC_TIMER_MOTOR, pins::MOTOR_IN1_GPIO),
        (LEDC_CH_MOTOR_IN2, LEDC_TIMER_MOTOR, pins::MOTOR_IN2_GPIO),
        (LEDC_CH_BUZZER, LEDC_TIMER_BUZZER, pins::BUZZER_GPIO),
    ];
    for (channel, timer_sel, gpio_num) in channels {
        let ret = unsafe {
            ledc_channel_config(&ledc_channel_config_t {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel,
                timer_sel,
                gpio_num,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            })
        };
        if ret != ESP_OK as esp_err_t {
            return Err(HwInitError::LedcChannelFailed(ret));
        }
    }

    info!(
        "hw_init: LEDC configured (in1=CH0, in2=CH1 @ {} Hz, buzzer=CH2)",
        motor_pwm_hz
    );
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) {
    // SAFETY: LEDC channels were configured in init_ledc(); duty register
    // writes are race-free since only the main loop calls this function.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, u32::from(duty));
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u8) {}

/// Retune one LEDC timer.  Every channel bound to it follows.
#[cfg(target_os = "espidf")]
pub fn ledc_set_freq(timer: u32, hz: u32) {
    // SAFETY: timer configured in init_ledc(); main-loop only.
    let ret = unsafe { esp_idf_svc::sys::ledc_set_freq(ledc_mode_t_LEDC_LOW_SPEED_MODE, timer, hz) };
    if ret != ESP_OK as esp_err_t {
        log::warn!("hw_init: ledc_set_freq(timer={}, {} Hz) failed (rc={})", timer, hz, ret);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set_freq(_timer: u32, _hz: u32) {}

/// Blocking delay that yields to the scheduler on target.
#[cfg(target_os = "espidf")]
pub fn delay_ms(ms: u32) {
    esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
}

#[cfg(not(target_os = "espidf"))]
pub fn delay_ms(ms: u32) {
    std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
}
