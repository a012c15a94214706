//! Li-ion pack monitor.
//!
//! The pack is sensed through a 22 kΩ / 10 kΩ divider on an ADC1 channel:
//!
//! ```text
//!   raw (0–4095) → pin V (3.3 V ref) → pack V (× 3.2) → % (3.0 V .. 4.2 V)
//! ```
//!
//! The conversion is linear between empty and full; good enough for the
//! four coarse levels the chimes distinguish.

use crate::config::FeederConfig;

const ADC_FULL_SCALE: f32 = 4095.0;
const ADC_REF_V: f32 = 3.3;
const DIVIDER_R1_KOHM: f32 = 22.0;
const DIVIDER_R2_KOHM: f32 = 10.0;
const EMPTY_V: f32 = 3.0;
const FULL_V: f32 = 4.2;

/// Coarse state of charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryLevel {
    Critical,
    Low,
    Medium,
    High,
}

impl core::fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Raw 12-bit ADC count → pack voltage.
pub fn pack_voltage(raw: u16) -> f32 {
    let pin_v = f32::from(raw.min(4095)) / ADC_FULL_SCALE * ADC_REF_V;
    pin_v * (DIVIDER_R1_KOHM + DIVIDER_R2_KOHM) / DIVIDER_R2_KOHM
}

/// Pack voltage → state of charge, clamped to 0–100.
pub fn percentage_from_voltage(v: f32) -> u8 {
    let v = if v.is_finite() { v.clamp(EMPTY_V, FULL_V) } else { EMPTY_V };
    ((v - EMPTY_V) / (FULL_V - EMPTY_V) * 100.0) as u8
}

/// Threshold table for [`BatteryLevel`].
#[derive(Debug, Clone, Copy)]
pub struct BatteryMonitor {
    critical_percent: u8,
    warning_percent: u8,
    moderate_percent: u8,
}

impl BatteryMonitor {
    pub fn new(config: &FeederConfig) -> Self {
        Self {
            critical_percent: config.battery_critical_percent,
            warning_percent: config.battery_warning_percent,
            moderate_percent: config.battery_moderate_percent,
        }
    }

    pub fn percentage(&self, raw: u16) -> u8 {
        percentage_from_voltage(pack_voltage(raw))
    }

    pub fn level_for(&self, percent: u8) -> BatteryLevel {
        if percent < self.critical_percent {
            BatteryLevel::Critical
        } else if percent < self.warning_percent {
            BatteryLevel::Low
        } else if percent < self.moderate_percent {
            BatteryLevel::Medium
        } else {
            BatteryLevel::High
        }
    }
}
