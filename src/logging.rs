//! Logging initialization for the demo binary.
//!
//! Library consumers of [`crate`] are free to install their own `log`
//! backend; this module only exists for the bundled CLI.

/// Initialize `env_logger` with sensible defaults for the demo binary.
///
/// Defaults to `Info` unless overridden by `RUST_LOG`. Always logs to
/// stderr; no log file, since this crate has no install directory of its
/// own to write one into.
pub fn init() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
