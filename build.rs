fn main() {
    println!("cargo:rerun-if-env-changed=FEEDER_CONFIG_JSON");

    // Host builds (unit + integration tests) have no ESP-IDF toolchain.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
