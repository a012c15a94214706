//! Piezo buzzer on LEDC timer 1.

use super::hw_init::{self, LEDC_CH_BUZZER, LEDC_TIMER_BUZZER};
use crate::app::ports::Speaker;

/// 50 % duty at 8-bit resolution: loudest square wave.
const TONE_DUTY: u8 = 128;

pub struct Buzzer;

impl Buzzer {
    pub fn new() -> Self {
        hw_init::ledc_set(LEDC_CH_BUZZER, 0);
        Self
    }
}

impl Default for Buzzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Speaker for Buzzer {
    fn make_sound(&mut self, freq_hz: u32, duration_ms: u32) {
        if freq_hz > 0 {
            hw_init::ledc_set_freq(LEDC_TIMER_BUZZER, freq_hz);
            hw_init::ledc_set(LEDC_CH_BUZZER, TONE_DUTY);
        }
        hw_init::delay_ms(duration_ms);
        hw_init::ledc_set(LEDC_CH_BUZZER, 0);
    }
}
