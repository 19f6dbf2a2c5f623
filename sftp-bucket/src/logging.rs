use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Initialise the global fmt subscriber.
///
/// Logs go to stderr so stdout carries only the JSON result. Verbosity follows
/// `RUST_LOG`, falling back to `info`.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
