//! Command implementations.
//!
//! - [`build`] - One-shot build, optionally followed by watching
//! - [`dev`] - Development server with live reload
//! - [`clean`] - Remove the output directory
//!
//! Each command provides an `execute` function that takes the parsed command
//! arguments and returns a Result.

pub mod build;
pub mod clean;
pub mod dev;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use clean::execute as clean_execute;
pub use dev::execute as dev_execute;
