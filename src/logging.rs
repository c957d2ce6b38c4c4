use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MEMECROP_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Installs the fmt subscriber. `MEMECROP_LOG` takes precedence over `RUST_LOG`.
/// Calling it again after a subscriber is installed is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
