//! Development server command implementation.
//!
//! Orchestrates the dev server lifecycle:
//! - Initial build (fatal if it cannot run)
//! - File watching with debouncing and content hashing
//! - HTTP server with SSE for live reload
//! - Graceful shutdown on Ctrl+C or SIGTERM

use crate::build::{Orchestrator, RebuildKind, RebuildOutcome};
use crate::cli::DevArgs;
use crate::commands::utils;
use crate::config::ConfigOverrides;
use crate::dev::{Coordinator, DevConfig, DevServer, DevServerState, WatchTargets};
use crate::error::{CliError, Result};
use crate::ui;
use std::sync::Arc;

/// Execute the dev command.
///
/// # Process Flow
///
/// 1. Load and validate configuration, pick a free port
/// 2. Perform the initial build
/// 3. Attach the file watcher
/// 4. Serve the output directory with the live-reload channel
/// 5. On shutdown: close the watcher, end every live-reload stream, then
///    stop the listener
///
/// # Errors
///
/// Returns errors for invalid configuration, an initial build that could
/// not run, a watcher that cannot start, or a server that cannot bind.
pub async fn execute(args: DevArgs) -> Result<()> {
    ui::info("Starting development server...");

    let overrides = ConfigOverrides {
        port: args.port,
        ..Default::default()
    };
    let (config, config_file) = utils::load_config(args.config.as_deref(), &overrides)?;
    config.validate_paths()?;
    let dev_config = DevConfig::from_site(&config, args.open)?;

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
    let state = Arc::new(DevServerState::new(config.paths.output_dir.clone()));

    ui::info("Performing initial build...");
    state.start_build();
    let report = match orchestrator.rebuild(RebuildKind::Initial).await {
        Ok(RebuildOutcome::Completed(report)) => report,
        Ok(RebuildOutcome::Busy) => {
            return Err(CliError::Build("another build is already running".to_string()))
        }
        Err(e) => {
            state.fail_build(e.to_string());
            ui::error(&format!("Initial build failed: {}", e));
            return Err(e);
        }
    };
    state.complete_build(report.duration_ms(), report.results.len(), report.failed());
    ui::print_build_summary(&report);
    if !report.is_success() {
        ui::warning(&format!(
            "{} pages failed; fix them and save to rebuild",
            report.failed()
        ));
    }

    let targets = WatchTargets::from_config(&config, config_file.as_deref());
    let (coordinator, requests) = Coordinator::new(
        orchestrator,
        Arc::clone(&state),
        dev_config.clone(),
        targets,
    );
    coordinator.attach_watcher()?;

    let server = DevServer::new(dev_config.clone(), Arc::clone(&coordinator));
    let listener = server.bind().await?;
    let runner = tokio::spawn(Arc::clone(&coordinator).run(requests));

    let url = dev_config.server_url();
    ui::success(&format!("Dev server running at {}", url));
    if dev_config.open {
        open_browser(&url);
    }
    ui::info("Press Ctrl+C to stop");

    let closing = Arc::clone(&coordinator);
    let shutdown = async move {
        utils::shutdown_signal().await;
        ui::info("Shutting down development server...");
        closing.shutdown();
        let closed = closing.state().close_all_clients();
        tracing::debug!(closed, "live-reload clients closed");
    };

    let result = server.serve(listener, shutdown).await;
    runner.abort();
    result?;

    ui::success("Development server stopped");
    Ok(())
}

/// Open the server URL in the default browser.
///
/// Uses platform-specific commands:
/// - macOS: `open`
/// - Windows: `start`
/// - Linux: `xdg-open`
fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => ui::info(&format!("Opened browser at {}", url)),
        Err(e) => ui::warning(&format!("Failed to open browser: {}", e)),
    }
}
