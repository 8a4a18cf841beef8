//process setup for the binary
use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber.
///
/// Logs go to stderr so `generate --output -` can stream the tape on stdout.
/// `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // a second call (e.g. from a test harness) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
