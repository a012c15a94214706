//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                         | Connects to                 |
//! |------------|------------------------------------|-----------------------------|
//! | `hardware` | InputPort, MotorPort, ScalePort,   | buttons, H-bridge, HX711,   |
//! |            | BatteryPort, Speaker, ClockPort    | battery ADC, buzzer         |
//! | `log_sink` | EventSink                          | Serial log output           |
//! | `time`     | ClockPort                          | ESP32 system timer          |
//!
//! The sleep controller (`SleepPort`) lives next to the retained state in
//! [`crate::power`].

pub mod hardware;
pub mod log_sink;
pub mod time;
