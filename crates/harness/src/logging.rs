//! Tracing setup for harness runs and tests

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "fracture=info";

/// Install a fmt subscriber filtered by `RUST_LOG`
///
/// Safe to call more than once: later calls, and calls after another
/// subscriber was installed, do nothing.
pub fn init() {
    init_with(DEFAULT_FILTER);
}

/// Like [`init`], with an explicit fallback filter
pub fn init_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
