//! Build orchestration.
//!
//! [`Orchestrator`] runs the page builder over every configured page in
//! configuration order, mirrors the static assets tree into the output
//! directory, and guards against overlapping rebuilds with an explicit
//! [`BuildState`] value.

use crate::config::{PageDescriptor, SiteConfig};
use crate::error::{CliError, Result};
use crate::fetch::Fetcher;
use crate::page::{BuildResult, PageBuilder};
use crate::render::TemplateEngine;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Subdirectory of the output root that receives the static assets tree.
pub const ASSETS_OUTPUT_DIR: &str = "assets";

/// Whether a rebuild is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildState {
    #[default]
    Idle,
    Building,
}

/// Which kind of rebuild to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildKind {
    /// Empties the output directory first
    Initial,
    /// Keeps served output in place and invalidates the template cache
    Incremental,
}

/// Exclusive right to run one rebuild.
///
/// Obtained from [`Orchestrator::try_begin`]; returns the orchestrator to
/// [`BuildState::Idle`] when dropped, whatever path the build took.
#[derive(Debug)]
pub struct BuildGuard {
    state: Arc<Mutex<BuildState>>,
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        *self.state.lock() = BuildState::Idle;
    }
}

/// Aggregate outcome of one rebuild.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// One entry per configured page, in configuration order
    pub results: Vec<BuildResult>,
    pub assets_copied: usize,
    pub duration: Duration,
}

impl BuildReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &BuildResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Result of asking for a guarded rebuild.
#[derive(Debug)]
pub enum RebuildOutcome {
    Completed(BuildReport),
    /// Another rebuild was already running; nothing was done
    Busy,
}

/// Runs the page builder over every configured page.
#[derive(Debug)]
pub struct Orchestrator {
    pages: Arc<[PageDescriptor]>,
    builder: PageBuilder,
    template_dir: PathBuf,
    assets_dir: PathBuf,
    output_dir: PathBuf,
    state: Arc<Mutex<BuildState>>,
}

impl Orchestrator {
    pub fn new(
        pages: impl Into<Arc<[PageDescriptor]>>,
        builder: PageBuilder,
        template_dir: impl Into<PathBuf>,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        let output_dir = builder.output_dir().to_path_buf();
        Self {
            pages: pages.into(),
            builder,
            template_dir: template_dir.into(),
            assets_dir: assets_dir.into(),
            output_dir,
            state: Arc::new(Mutex::new(BuildState::Idle)),
        }
    }

    /// Wire up fetcher, engine and page builder from a resolved site config.
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        let fetcher = Fetcher::new(&config.api).map_err(|e| CliError::Build(e.to_string()))?;
        let builder = PageBuilder::new(
            &config.paths.template_dir,
            &config.paths.output_dir,
            fetcher,
            TemplateEngine::new(),
        );
        Ok(Self::new(
            config.descriptors(),
            builder,
            &config.paths.template_dir,
            &config.paths.assets_dir,
        ))
    }

    pub fn pages(&self) -> &[PageDescriptor] {
        &self.pages
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn state(&self) -> BuildState {
        *self.state.lock()
    }

    pub fn is_building(&self) -> bool {
        self.state() == BuildState::Building
    }

    /// Atomically move from `Idle` to `Building`.
    ///
    /// Returns `None` when a rebuild is already in flight.
    pub fn try_begin(&self) -> Option<BuildGuard> {
        let mut state = self.state.lock();
        match *state {
            BuildState::Building => None,
            BuildState::Idle => {
                *state = BuildState::Building;
                Some(BuildGuard {
                    state: Arc::clone(&self.state),
                })
            }
        }
    }

    /// Guarded rebuild. A call made while another rebuild runs is a no-op.
    pub async fn rebuild(&self, kind: RebuildKind) -> Result<RebuildOutcome> {
        let Some(guard) = self.try_begin() else {
            tracing::warn!("build already in progress, skipping request");
            return Ok(RebuildOutcome::Busy);
        };
        self.rebuild_with(guard, kind)
            .await
            .map(RebuildOutcome::Completed)
    }

    /// Run a rebuild under a guard the caller already holds.
    pub async fn rebuild_with(&self, guard: BuildGuard, kind: RebuildKind) -> Result<BuildReport> {
        let started = Instant::now();
        tracing::info!(?kind, pages = self.pages.len(), "rebuild started");

        match kind {
            RebuildKind::Initial => self.clear_output().await?,
            RebuildKind::Incremental => self.builder.engine().invalidate(),
        }

        let results = self.rebuild_all().await;
        let assets_copied = self.copy_assets().await?;
        drop(guard);

        let report = BuildReport {
            results,
            assets_copied,
            duration: started.elapsed(),
        };
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            assets = report.assets_copied,
            duration_ms = report.duration_ms(),
            "rebuild finished"
        );
        Ok(report)
    }

    /// Build every page sequentially; one result per page, in order.
    pub async fn rebuild_all(&self) -> Vec<BuildResult> {
        let mut results = Vec::with_capacity(self.pages.len());
        for page in self.pages.iter() {
            results.push(self.builder.build(page).await);
        }
        results
    }

    /// Mirror the assets source tree into `<output>/assets`.
    ///
    /// Returns the number of files copied; a missing assets directory copies
    /// nothing.
    pub async fn copy_assets(&self) -> Result<usize> {
        if !self.assets_dir.is_dir() {
            tracing::debug!(path = %self.assets_dir.display(), "no assets directory");
            return Ok(0);
        }

        let target_root = self.output_dir.join(ASSETS_OUTPUT_DIR);
        let mut copied = 0;

        for entry in WalkDir::new(&self.assets_dir).follow_links(true) {
            let entry = entry.map_err(|e| CliError::Build(format!("walking assets: {}", e)))?;
            let Ok(relative) = entry.path().strip_prefix(&self.assets_dir) else {
                continue;
            };
            let target = target_root.join(relative);

            if entry.file_type().is_dir() {
                tokio::fs::create_dir_all(&target).await?;
            } else {
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::copy(entry.path(), &target).await?;
                copied += 1;
            }
        }

        Ok(copied)
    }

    /// Empty the output directory, refusing to touch one that holds sources.
    async fn clear_output(&self) -> Result<()> {
        for source in [&self.template_dir, &self.assets_dir] {
            if source.starts_with(&self.output_dir) {
                return Err(CliError::Build(format!(
                    "output directory {} contains source directory {}; refusing to clear it",
                    self.output_dir.display(),
                    source.display()
                )));
            }
        }

        match tokio::fs::remove_dir_all(&self.output_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tracing::debug!(path = %self.output_dir.display(), "output directory cleared");
        Ok(())
    }
}
