//! Process logging.
//!
//! JSON lines on stdout; `RUST_LOG` controls filtering. Correlation fields
//! (tenant, work order, invoice) ride on the log events the services emit.

use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber, filtered by `RUST_LOG` with a
/// fallback of `info`.
///
/// Safe to call more than once: only the first call installs anything, so
/// test binaries can call it from every test.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter);
}

/// Install with explicit filter directives, e.g. `"wrenchflow_infra=debug"`.
pub fn init_with_filter(directives: &str) {
    install(EnvFilter::new(directives));
}

fn install(filter: EnvFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
