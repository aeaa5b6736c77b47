//! Logging setup
//!
//! Logs go to stderr through `tracing-subscriber` so stdout stays free for
//! results. `RUST_LOG` overrides the verbosity-derived filter.

use crate::cli::Verbosity;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; later calls are no-ops
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_directive(verbosity: Verbosity) -> String {
    format!("{}={}", env!("CARGO_PKG_NAME"), verbosity.log_filter())
}
