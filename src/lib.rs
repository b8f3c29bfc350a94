pub mod config;
pub mod dataset;
pub mod error;
pub mod filters;
pub mod model;
pub mod output;
pub mod query;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging.
///
/// The verbosity count raises the base level from `error` up to `trace`;
/// `RUST_LOG` still wins when set. Logs go to stderr so stdout stays
/// machine-parseable.
pub fn init_tracing(verbosity: u8) {
    let base_level = match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
