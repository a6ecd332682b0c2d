//! Miette diagnostic conversion for CLI errors.
//!
//! This module provides conversion from CLI errors to miette diagnostics
//! for readable error reporting at the process boundary.

use crate::error::{CliError, ConfigError};
use ::miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => config_error_to_miette(e),
        CliError::Build(msg) => ::miette::miette!(
            help = "Fix the failing pages listed above and run the build again",
            "Build failed: {}",
            msg
        ),
        CliError::Watch(e) => ::miette::miette!(
            help = "The watched directories must exist and be readable",
            "File watcher error: {}",
            e
        ),
        _ => ::miette::miette!("{}", err),
    }
}

/// Convert ConfigError to miette Report
pub fn config_error_to_miette(err: ConfigError) -> Report {
    match err {
        ConfigError::InvalidValue { field, value, hint } => ::miette::miette!(
            help = hint,
            "Invalid value for '{}': {}",
            field,
            value
        ),
        ConfigError::MissingField { field, hint } => {
            ::miette::miette!(help = hint, "Missing required field: {}", field)
        }
        _ => ::miette::miette!("Configuration error: {}", err),
    }
}
