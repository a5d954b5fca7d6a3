//! Log output for the CLI
//!
//! Library crates log through the `log` facade. The subscriber installed here
//! bridges those records and prints them on stderr: warnings always, debug
//! output with `--verbose`. `SLUICE_LOG` overrides the filter.

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SLUICE_LOG";

/// Filter used when `SLUICE_LOG` is unset
pub(crate) fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "sluice=debug"
    } else {
        "sluice=warn"
    }
}

pub(crate) fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    // Only the first subscriber in a process wins
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

#[cfg(test)]
#[path = "logging_test.rs"]
mod tests;
