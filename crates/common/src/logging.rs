use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global stderr subscriber. `RUST_LOG` wins over the caller's
/// default; calling twice is a no-op so tests can initialize freely.
pub fn init_logging(default_level: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
