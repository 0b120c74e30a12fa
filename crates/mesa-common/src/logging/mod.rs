//! Unified logging initialization for MESA hosts and tests
//!
//! This module provides a standardized logging setup that respects the
//! following priority order:
//! 1. RUST_LOG environment variable - highest priority
//! 2. Caller-provided default filter - lowest priority

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with the given default filter.
///
/// # Arguments
///
/// * `default_filter` - The default filter string if RUST_LOG is not set
///
/// # Example
///
/// ```no_run
/// use mesa_common::logging;
///
/// logging::init_logging("mesa_sdk=info").unwrap();
/// ```
pub fn init_logging(default_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true) // Show module path
                .with_file(true) // Show source file
                .with_line_number(true) // Show line number
                .compact(), // Use compact format
        )
        .init();

    Ok(())
}

/// Initialize logging if no global subscriber is installed yet.
///
/// Safe to call repeatedly, which makes it suitable for test binaries where
/// several tests race to set up logging.
///
/// # Returns
///
/// * `true` if logging was initialized by this call
/// * `false` if a subscriber was already installed
pub fn try_init_logging(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).compact())
        .try_init()
        .is_ok()
}
