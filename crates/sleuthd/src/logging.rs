//! Tracing subscriber setup shared by the Sleuth binaries.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "SLEUTH_LOG";

/// Install a stderr subscriber filtered by `SLEUTH_LOG`, falling back to
/// `default_directive` (e.g. "warn"). Safe to call more than once.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
