#![forbid(unsafe_code)]

//! Test logging bootstrap.

use tracing_subscriber::EnvFilter;

/// Variable consulted first for the log filter; `RUST_LOG` is the fallback.
pub const LOG_ENV: &str = "WAYPOINT_LOG";

/// Directives used when neither variable is set.
pub const DEFAULT_DIRECTIVES: &str = "warn";

/// Build the filter from `WAYPOINT_LOG`, then `RUST_LOG`, then
/// [`DEFAULT_DIRECTIVES`].
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install a fmt subscriber that writes through the test harness capture.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_test_logging();
        init_test_logging();
        tracing::debug!(message = "harness.logging", ok = true);
    }
}
