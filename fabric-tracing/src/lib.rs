//! Process-wide logging setup. The core only ever talks to the `tracing`
//! facade (spec §6 "A `Logger` ... is injected"); this crate is the one
//! place that decides how those events reach stdout/stderr.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<Mutex<()>> = OnceCell::new();

/// Installs a global `tracing` subscriber reading its filter from
/// `RUST_LOG`, falling back to `default_filter` when unset. Safe to call
/// more than once (e.g. once per test): subsequent calls are no-ops rather
/// than panicking on "subscriber already set".
pub fn init_logging(default_filter: &str) {
    let guard = INIT.get_or_init(|| Mutex::new(()));
    let _lock = guard.lock();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    // `set_global_default` errors if a subscriber is already installed;
    // that's expected on the second and later call, not a bug.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging("info");
        init_logging("debug");
    }
}
