//! Logging init: stderr, no ANSI, filter from `RUST_LOG` or the `-v` count.

use tracing_subscriber::EnvFilter;

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,fetchzip=info",
        _ => "info,fetchzip=debug",
    }
}

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
