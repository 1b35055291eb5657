use crate::constants::LOG_FILTER_ENV;
use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber. Diagnostics stay quiet unless `verbose` is
/// set or `COPSE_LOG` provides an explicit filter.
pub(crate) fn init(verbose: bool) {
    let default_directive = if verbose { "copse=debug" } else { "error" };
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .try_init();
}
