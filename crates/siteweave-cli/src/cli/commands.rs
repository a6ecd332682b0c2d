use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::validation::parse_port;

/// Available siteweave subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build every configured page
    ///
    /// Clears the output directory, builds all pages in configuration order
    /// and copies the static assets. Exits non-zero if any page failed.
    Build(BuildArgs),

    /// Start the development server with live reload
    ///
    /// Runs an initial build, serves the output directory and rebuilds
    /// whenever templates, assets or the config file change.
    Dev(DevArgs),

    /// Remove the output directory
    Clean(CleanArgs),
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to siteweave.config.json or siteweave.config.toml
    ///
    /// If not provided, searches the current directory.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keep watching and rebuild on changes (no server)
    #[arg(short, long)]
    pub watch: bool,

    /// Override the configured output directory
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

/// Arguments for the dev command (development server)
#[derive(Args, Debug)]
pub struct DevArgs {
    /// Path to siteweave.config.json or siteweave.config.toml
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Port for development server
    ///
    /// Overrides `dev.port`. If the port is taken, the next ten are tried.
    #[arg(short, long, value_parser = parse_port, value_name = "PORT")]
    pub port: Option<u16>,

    /// Open browser automatically on server start
    #[arg(long)]
    pub open: bool,
}

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Path to siteweave.config.json or siteweave.config.toml
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
