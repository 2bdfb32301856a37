//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Honors `RUST_LOG`; defaults to `info` for this crate when unset.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Initialize logging for tests (safe to call repeatedly)
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
