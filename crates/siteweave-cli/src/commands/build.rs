//! Build command implementation.
//!
//! Implements `siteweave build`: clear the output directory, build every
//! page, copy assets and print a summary. With `--watch` the process keeps
//! running and rebuilds on change, without serving anything.

use crate::build::{BuildReport, Orchestrator, RebuildKind, RebuildOutcome};
use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::config::{ConfigOverrides, SiteConfig};
use crate::dev::{Coordinator, DevConfig, DevServerState, WatchTargets};
use crate::error::{CliError, Result};
use crate::ui;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Execute the build command.
///
/// # Build Process
///
/// 1. Load and validate configuration (CLI > Env > File > Defaults)
/// 2. Build all pages into a freshly cleared output directory
/// 3. Display build summary
/// 4. With `--watch`, rebuild on every change until interrupted
///
/// # Errors
///
/// Returns errors for invalid configuration, a build that could not run,
/// or (without `--watch`) any failed page.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let overrides = ConfigOverrides {
        output_dir: args.out_dir.clone(),
        ..Default::default()
    };
    let (config, config_file) = utils::load_config(args.config.as_deref(), &overrides)?;
    config.validate_paths()?;

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
    ui::info(&format!(
        "Building {} pages into {}",
        orchestrator.pages().len(),
        orchestrator.output_dir().display()
    ));

    let report = match orchestrator.rebuild(RebuildKind::Initial).await? {
        RebuildOutcome::Completed(report) => report,
        RebuildOutcome::Busy => {
            return Err(CliError::Build("another build is already running".to_string()))
        }
    };
    ui::print_build_summary(&report);

    if !args.watch {
        return finish(&report);
    }

    if !report.is_success() {
        ui::warning(&format!("{} pages failed; watching anyway", report.failed()));
    }
    watch(&config, config_file, orchestrator).await
}

fn finish(report: &BuildReport) -> Result<()> {
    if report.is_success() {
        ui::success(&format!(
            "Built {} pages in {}",
            report.results.len(),
            ui::format_duration(report.duration)
        ));
        return Ok(());
    }

    for failure in report.failures() {
        ui::error(&format!(
            "{}: {}",
            failure.template,
            failure.error.as_deref().unwrap_or("unknown error")
        ));
    }
    Err(CliError::Build(format!(
        "{} of {} pages failed",
        report.failed(),
        report.results.len()
    )))
}

/// Rebuild on change until Ctrl+C. Lifecycle events go nowhere since no
/// browser is connected.
async fn watch(
    config: &SiteConfig,
    config_file: Option<PathBuf>,
    orchestrator: Arc<Orchestrator>,
) -> Result<()> {
    let state = Arc::new(DevServerState::new(config.paths.output_dir.clone()));
    let dev_config = DevConfig::with_addr(
        config,
        SocketAddr::from(([127, 0, 0, 1], config.dev.port)),
        false,
    );
    let targets = WatchTargets::from_config(config, config_file.as_deref());

    let (coordinator, requests) = Coordinator::new(orchestrator, state, dev_config, targets);
    coordinator.attach_watcher()?;
    let runner = tokio::spawn(Arc::clone(&coordinator).run(requests));

    ui::info("Watching for changes. Press Ctrl+C to stop");
    utils::shutdown_signal().await;

    coordinator.shutdown();
    runner.abort();
    ui::success("Stopped watching");
    Ok(())
}
