//! Structured logging with `tracing`.
//!
//! Every crate logs through `tracing` macros with structured fields. The binary
//! installs a compact `fmt` subscriber writing to stderr, filtered by `RUST_LOG`
//! when set and by the configured level otherwise.

/// Install the compact stderr subscriber. `level` is the filter directive
/// used when `RUST_LOG` is unset. Only the first install in a process wins.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

/// Like [`init_subscriber`] but emits one JSON object per line.
pub fn init_json_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init();
}
