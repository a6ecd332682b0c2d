//! Logging infrastructure for the siteweave CLI.
//!
//! Structured logging on the `tracing` ecosystem, with verbosity flags and
//! `RUST_LOG` overrides.
//!
//! ```rust,no_run
//! use siteweave_cli::logger::init_logger;
//! use tracing::{debug, info};
//!
//! init_logger(false, false, false);
//!
//! info!("Starting build");
//! debug!(template = "index.html", "rendering");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter for `--verbose`.
pub const VERBOSE_FILTER: &str = "siteweave=debug,siteweave_cli=debug,tower_http=debug";

/// Filter for `--quiet`.
pub const QUIET_FILTER: &str = "siteweave=error,siteweave_cli=error";

/// Filter used when neither a flag nor `RUST_LOG` is given.
pub const DEFAULT_FILTER: &str = "siteweave=info,siteweave_cli=info";

/// Pick the filter for the given flags.
///
/// The logging level is determined in this order:
/// 1. `--verbose`: DEBUG for siteweave crates
/// 2. `--quiet`: ERROR only
/// 3. `RUST_LOG`
/// 4. INFO for siteweave crates
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the tracing subscriber.
///
/// Call once at the start of the program, before any logging occurs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize logger with custom environment filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
