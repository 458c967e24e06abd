use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "filebase=info";
const VERBOSE_LOG_FILTER: &str = "filebase=debug";

/// Install the stderr subscriber. `RUST_LOG` wins unless `verbose` is set.
/// Calling it twice is harmless.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
