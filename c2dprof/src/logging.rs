//! Console logging for the batch binaries.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Install a timestamped stderr subscriber.
///
/// The level comes from `RUST_LOG` and defaults to `info`; `verbose` lowers
/// the default to `debug`.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .init();
}
