//! Siteweave - API-driven static site generator.
//!
//! Fetches JSON from an HTTP API, renders it into HTML templates and writes
//! the pages to an output directory. In development it watches the sources,
//! rebuilds on change and tells connected browsers to reload.
//!
//! # Architecture
//!
//! - [`fetch`] - HTTP data fetching
//! - [`render`] - Template engine with an explicit template root
//! - [`page`] - Builds one page, including sub-template asset extraction
//! - [`build`] - Runs every page, copies assets, guards against overlap
//! - [`dev`] - Change detection, debouncing, rebuild cycles and the dev server
//! - [`config`] - Layered configuration loading and validation
//! - [`error`] - Error types with actionable messages
//! - [`logger`], [`ui`] - Structured logging and terminal output
//!
//! # Example
//!
//! ```rust,no_run
//! use siteweave_cli::build::{Orchestrator, RebuildKind};
//! use siteweave_cli::config::{ConfigOverrides, SiteConfig};
//! use std::path::Path;
//!
//! # async fn run() -> siteweave_cli::Result<()> {
//! let (config, _) = SiteConfig::load(&ConfigOverrides::default(), None, Path::new("."))?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//! orchestrator.rebuild(RebuildKind::Initial).await?;
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod fetch;
pub mod logger;
pub mod page;
pub mod render;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt};
