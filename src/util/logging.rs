//! Tracing setup for the CLI.

use crate::constants;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. `VENVTAP_LOG` wins over the verbosity flag.
pub fn init(verbose: u8) {
    let level = match verbose {
        0 => "venvtap=warn",
        1 => "venvtap=info",
        2 => "venvtap=debug",
        _ => "venvtap=trace",
    };
    let filter = EnvFilter::try_from_env(constants::LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
