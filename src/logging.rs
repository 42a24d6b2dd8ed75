//! Diagnostics go to stderr through `tracing`; stdout stays reserved for
//! command output.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Environment variable overriding the filter, e.g. `PROMPTKIT_LOG=promptkit=trace`
pub const LOG_ENV: &str = "PROMPTKIT_LOG";

/// Filter directive for a `-v` count
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "promptkit=info,warn",
        2 => "promptkit=debug,info",
        _ => "trace",
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .without_time()
        .with_filter(filter);

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}
