//! Fuzz target: `FeederConfig::from_json`
//!
//! Feeds arbitrary bytes to the JSON config loader and verifies:
//! - No panics under arbitrary input
//! - Anything accepted also passes `validate()` and survives a
//!   serialise / parse round trip
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use feeder::config::FeederConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = FeederConfig::from_json(text) else {
        return;
    };
    assert!(config.validate().is_ok());
    assert!(config.motor_min_voltage < config.motor_max_voltage);

    let json = serde_json::to_string(&config).expect("serialise accepted config");
    assert!(FeederConfig::from_json(&json).is_ok());
});
