use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,scholarstream=debug";

/// Initialise the global `tracing` subscriber with a standard `fmt` layer.
///
/// Respects the `RUST_LOG` environment variable and falls back to
/// `info,scholarstream=debug`. Calling it again after a subscriber is
/// installed does nothing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
