//! Logging utilities for Seesaw Rust components.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize tracing from a configured level and format.
///
/// Uses the RUST_LOG environment variable to control log levels when set,
/// `default_level` otherwise. `json` selects structured output.
pub fn init_with(default_level: &str, json: bool) {
    let registry = tracing_subscriber::registry().with(filter(default_level));
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Install a test writer subscriber, ignoring the error when one is
/// already installed by another test in the same binary.
pub fn try_init_test() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter("debug"))
        .try_init();
}
