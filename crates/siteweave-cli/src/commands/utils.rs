//! Shared utilities for command implementations.

use crate::config::{ConfigOverrides, SiteConfig};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;
use std::path::{Path, PathBuf};

/// Get the current working directory.
///
/// # Errors
///
/// Returns I/O error if current directory cannot be determined.
pub fn get_cwd() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| {
        CliError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to get current directory: {}", e),
        ))
    })
}

/// Load and validate the site configuration for a command.
///
/// Returns the config plus the file it came from, which the watcher observes.
pub fn load_config(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<(SiteConfig, Option<PathBuf>)> {
    let cwd = get_cwd()?;
    let (config, config_file) = SiteConfig::load(overrides, config_path, &cwd)?;

    match config_file {
        Some(ref file) => ui::info(&format!("Using config {}", file.display())),
        None => ui::warning("No siteweave.config.json found, using defaults"),
    }

    config.validate()?;
    Ok((config, config_file))
}

/// Resolve on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Remove an output directory.
///
/// Returns `false` if it did not exist. Refuses to remove a directory that
/// contains the working directory or one of the source directories.
pub fn remove_output_dir(config: &SiteConfig, cwd: &Path) -> Result<bool> {
    let out_dir = &config.paths.output_dir;
    if !out_dir.exists() {
        return Ok(false);
    }
    if !out_dir.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "Output path exists but is not a directory: {}",
            out_dir.display()
        )));
    }

    let protected = [
        cwd,
        config.paths.template_dir.as_path(),
        config.paths.assets_dir.as_path(),
    ];
    for path in protected {
        if path.starts_with(out_dir) {
            return Err(CliError::InvalidArgument(format!(
                "Refusing to remove {}: it contains {}",
                out_dir.display(),
                path.display()
            )));
        }
    }

    std::fs::remove_dir_all(out_dir)
        .context(format!("Failed to remove {}", out_dir.display()))?;
    Ok(true)
}
