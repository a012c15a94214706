//! Peripheral drivers and hardware initialisation.

pub mod button;
pub mod buzzer;
pub mod hw_init;
pub mod hx711;
pub mod motor_pwm;
