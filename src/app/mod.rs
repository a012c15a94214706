//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the feeder: gesture
//! dispatch, the feeding cycle, inactivity and sleep decisions.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod board;
pub mod commands;
pub mod events;
pub mod ports;
