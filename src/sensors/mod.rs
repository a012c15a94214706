//! Sensor subsystem.
//!
//! - [`load_cell`]: feed-flow detector over the HX711 scale port.
//! - [`battery`]: pack voltage → charge percentage → coarse level.

pub mod battery;
pub mod load_cell;
