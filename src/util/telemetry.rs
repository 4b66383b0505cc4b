//! Tracing setup for binaries and tests.

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber driven by `RUST_LOG`, falling back to
/// `workpool=info` when the variable is unset. A no-op if a subscriber is
/// already installed, so embedding applications keep their own setup.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("workpool=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
