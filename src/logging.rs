//! Log subscriber setup for the command line tool
//!
//! Logs go to stderr so stdout only carries command output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for the given verbosity flags
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "aligerar=error"
    } else if verbose {
        "aligerar=debug,info"
    } else {
        "aligerar=warn"
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the flags.
pub fn init_cli_logger(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    // A subscriber may already be installed when embedded in another binary
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
