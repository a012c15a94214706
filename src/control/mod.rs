//! Actuator control.

pub mod motor;
