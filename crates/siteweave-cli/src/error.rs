//! Error handling for the Siteweave CLI.
//!
//! This module provides a hierarchical error type system using `thiserror`.
//! Each variant is meant to be actionable: it says what failed and, where it
//! helps, what to check next.
//!
//! # Architecture
//!
//! - **Top-level errors** (`CliError`) represent broad categories of failures
//! - **Domain-specific errors** (`ConfigError`, `FetchError`, `PageError`,
//!   `WatchError`) carry the details
//! - **Error conversion** is automatic via `#[from]` attributes
//! - **Context helpers** ([`ResultExt`]) attach paths, hints and messages
//!
//! Page-level errors never escape the page builder: they are turned into a
//! failed [`BuildResult`](crate::page::BuildResult) so the remaining pages
//! still get built.
//!
//! # Example
//!
//! ```rust,no_run
//! use siteweave_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_template(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Check the 'templateDir' setting")
//! }
//! ```

pub mod miette;

use std::path::PathBuf;
use thiserror::Error;

pub use self::miette::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (file not found, invalid syntax, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The build as a whole could not run or produced failed pages
    #[error("Build error: {0}")]
    Build(String),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] WatchError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file doesn't exist at the expected location
    #[error("Config file not found: {}\n\nHint: Create a siteweave.config.json file or pass --config <path>", .0.display())]
    NotFound(PathBuf),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// Two pages write to the same output file
    #[error("Duplicate output path '{0}'\n\nHint: Every page needs its own 'output'")]
    DuplicateOutput(String),

    /// Figment could not merge or extract the configuration
    #[error("Failed to load configuration: {0}\n\nHint: Check siteweave.config.json syntax and field types")]
    Extract(String),
}

/// Failures surfaced by the [`Fetcher`](crate::fetch::Fetcher).
///
/// The fetcher never retries; callers decide what to do with these.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API answered with a non-2xx status
    #[error("API error ({status}): {reason}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase or response text
        reason: String,
    },

    /// No response arrived (connection refused, timeout, DNS, ...)
    #[error("Network error: unable to reach {url}: {message}")]
    Network {
        /// Fully-qualified request URL
        url: String,
        /// Underlying transport message
        message: String,
    },

    /// The request could not be set up or the body was not JSON
    #[error("Request configuration error: {0}")]
    Config(String),
}

/// Per-page build failures.
///
/// Every variant is fatal to one page only.
#[derive(Debug, Error)]
pub enum PageError {
    /// The page's template file does not exist
    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// Fetching or transforming the page data failed
    #[error("Data error: {0}")]
    Data(String),

    /// Template compilation or evaluation failed
    #[error("Render error: {0}")]
    Render(String),

    /// The staging root could not be set up or torn down
    #[error("Staging error: {0}")]
    Staging(String),

    /// Reading sub-templates or writing output failed
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl PageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PageError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<FetchError> for PageError {
    fn from(err: FetchError) -> Self {
        PageError::Data(format!("API request failed: {}", err))
    }
}

/// File-system observation failures.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The notify backend reported an error
    #[error("{0}")]
    Notify(#[from] notify::Error),

    /// A configured watch root does not exist
    #[error("Watch path does not exist: {}", .0.display())]
    MissingRoot(PathBuf),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
