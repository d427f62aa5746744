//! Logging setup.
//!
//! Library crates only emit `tracing` events; binaries decide where they
//! go. [`init`] installs the usual console subscriber.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, defaulting to
/// `info`.
///
/// Calling it twice is harmless: the second call leaves the first
/// subscriber in place and returns `false`.
pub fn init() -> bool {
    init_with_default("info")
}

/// Like [`init`], with a custom fallback filter for when `RUST_LOG` is
/// unset or invalid (e.g. `"edudash=debug,info"`).
pub fn init_with_default(directives: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .is_ok()
}
