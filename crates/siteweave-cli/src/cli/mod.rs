//! Command-line interface definition.
//!
//! # Command Structure
//!
//! - `siteweave build` - Build every configured page once (or keep watching)
//! - `siteweave dev` - Development server with live reload
//! - `siteweave clean` - Remove the output directory

mod commands;
mod validation;

use clap::Parser;

pub use commands::{BuildArgs, CleanArgs, Command, DevArgs};
pub use validation::parse_port;

/// Siteweave - API-driven static site generator
#[derive(Parser, Debug)]
#[command(
    name = "siteweave",
    version,
    about = "API-driven static site generator",
    long_about = "Siteweave fetches JSON from an HTTP API, renders it into HTML templates\n\
                  and writes the pages to an output directory. In development it watches\n\
                  templates and assets, rebuilds on change and reloads connected browsers."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    ///
    /// Outputs plain text without ANSI color codes. Useful for logging to
    /// files or systems that don't support colored terminal output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
