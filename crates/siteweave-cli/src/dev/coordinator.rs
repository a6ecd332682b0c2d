//! Rebuild cycles in watch mode.
//!
//! One cycle: take the build guard, detach the watcher, broadcast
//! `build-start`, rebuild, broadcast the outcome, then schedule `reload` and
//! the attachment of a fresh watcher. The watcher is never attached while a
//! rebuild runs, so the build's own writes cannot trigger the next one.
//!
//! Reattachment is tagged with a cycle generation. A later cycle (or
//! shutdown) bumps the generation, and a stale reattach timer then does
//! nothing.

use crate::build::{BuildReport, Orchestrator, RebuildKind};
use crate::dev::watcher::{RebuildRequest, SharedDetector, SiteWatcher, WatchTargets};
use crate::dev::{ChangeDetector, DevConfig, DevEvent, SharedState};
use crate::error::WatchError;
use crate::ui;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Buffered rebuild requests; one is enough since a cycle covers all
/// changes that happened before it started.
const REQUEST_BUFFER: usize = 1;

/// Result of one rebuild cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(BuildReport),
    /// The rebuild could not run (output directory, asset copy)
    Failed(String),
    /// Another rebuild was already in flight
    Busy,
}

pub struct Coordinator {
    orchestrator: Arc<Orchestrator>,
    state: SharedState,
    config: DevConfig,
    targets: WatchTargets,
    detector: SharedDetector,
    requests: mpsc::Sender<RebuildRequest>,
    watcher: Mutex<Option<SiteWatcher>>,
    generation: AtomicU64,
}

impl Coordinator {
    /// Create the coordinator and the receiving end of its request channel.
    ///
    /// Feed the receiver to [`Coordinator::run`].
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        state: SharedState,
        config: DevConfig,
        targets: WatchTargets,
    ) -> (Arc<Self>, mpsc::Receiver<RebuildRequest>) {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let detector = Arc::new(Mutex::new(ChangeDetector::new(config.timing.window)));
        let coordinator = Arc::new(Self {
            orchestrator,
            state,
            config,
            targets,
            detector,
            requests: tx,
            watcher: Mutex::new(None),
            generation: AtomicU64::new(0),
        });
        (coordinator, rx)
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn is_building(&self) -> bool {
        self.orchestrator.is_building()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Attach a fresh watcher, replacing any current one.
    pub fn attach_watcher(&self) -> Result<(), WatchError> {
        let watcher = SiteWatcher::attach(
            &self.targets,
            Arc::clone(&self.detector),
            self.config.timing,
            self.requests.clone(),
        )?;
        tracing::info!(roots = ?watcher.roots(), "watching for changes");
        *self.watcher.lock() = Some(watcher);
        Ok(())
    }

    /// Stop observing. Returns whether a watcher was attached.
    pub fn detach_watcher(&self) -> bool {
        self.watcher.lock().take().is_some()
    }

    /// Consume rebuild requests until the channel closes.
    pub async fn run(self: Arc<Self>, mut requests: mpsc::Receiver<RebuildRequest>) {
        while let Some(request) = requests.recv().await {
            self.log_request(&request);
            self.run_cycle().await;

            // Anything sent just before the detach is already covered
            while requests.try_recv().is_ok() {}
        }
    }

    fn log_request(&self, request: &RebuildRequest) {
        for change in &request.changes {
            ui::info(&format!(
                "File {}: {}",
                change.kind.label(),
                change.path.display()
            ));
        }
        if let Some(ref config_file) = self.targets.config_file {
            let canonical = std::fs::canonicalize(config_file).unwrap_or_else(|_| config_file.clone());
            if request.touches(&canonical) || request.touches(config_file) {
                ui::warning("Configuration changed; restart to apply page and path changes");
            }
        }
    }

    /// Run one full rebuild cycle, or report `Busy` without side effects.
    ///
    /// The cycle runs on its own task, so dropping the returned future (an
    /// HTTP client going away) never stops a rebuild halfway with the
    /// watcher detached.
    pub async fn run_cycle(self: &Arc<Self>) -> CycleOutcome {
        let this = Arc::clone(self);
        match tokio::spawn(this.cycle()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "rebuild task failed");
                CycleOutcome::Failed(e.to_string())
            }
        }
    }

    async fn cycle(self: Arc<Self>) -> CycleOutcome {
        let Some(guard) = self.orchestrator.try_begin() else {
            tracing::warn!("rebuild already in progress, ignoring trigger");
            return CycleOutcome::Busy;
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.detach_watcher() {
            tracing::debug!("watcher paused for rebuild");
        }

        self.state.start_build();
        self.state.broadcast(&DevEvent::BuildStart);

        let outcome = match self
            .orchestrator
            .rebuild_with(guard, RebuildKind::Incremental)
            .await
        {
            Ok(report) => {
                self.state.complete_build(
                    report.duration_ms(),
                    report.results.len(),
                    report.failed(),
                );
                self.state.broadcast(&DevEvent::BuildComplete {
                    duration_ms: report.duration_ms(),
                    pages: report.results.len(),
                    failed: report.failed(),
                });
                ui::print_build_summary(&report);
                self.schedule_reload();
                CycleOutcome::Completed(report)
            }
            Err(e) => {
                let message = e.to_string();
                self.state.fail_build(message.clone());
                self.state.broadcast(&DevEvent::BuildError {
                    message: message.clone(),
                });
                ui::error(&format!("Rebuild failed: {}", message));
                CycleOutcome::Failed(message)
            }
        };

        self.schedule_reattach(generation);
        outcome
    }

    fn schedule_reload(&self) {
        let state = Arc::clone(&self.state);
        let delay = self.config.reload_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let clients = state.broadcast(&DevEvent::Reload);
            tracing::debug!(clients, "reload sent");
        });
    }

    fn schedule_reattach(self: &Arc<Self>, generation: u64) {
        let this = Arc::clone(self);
        let delay = self.config.reattach_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if this.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = this.attach_watcher() {
                ui::error(&format!("Failed to resume watching: {}", e));
            }
        });
    }

    /// Cancel pending reattachment and drop the watcher.
    pub fn shutdown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if self.detach_watcher() {
            tracing::debug!("watcher closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, PageDescriptor};
    use crate::dev::{DebounceTiming, DevServerState};
    use crate::fetch::Fetcher;
    use crate::page::PageBuilder;
    use crate::render::TemplateEngine;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup(root: &Path) -> (Arc<Coordinator>, mpsc::Receiver<RebuildRequest>) {
        setup_with(
            root,
            ApiConfig::default(),
            PageDescriptor::new("index.html", "index.html"),
        )
    }

    fn setup_with(
        root: &Path,
        api: ApiConfig,
        page: PageDescriptor,
    ) -> (Arc<Coordinator>, mpsc::Receiver<RebuildRequest>) {
        fs::create_dir_all(root.join("templates")).unwrap();
        fs::write(root.join("templates/index.html"), "<p>hi</p>").unwrap();

        let builder = PageBuilder::new(
            root.join("templates"),
            root.join("dist"),
            Fetcher::new(&api).unwrap(),
            TemplateEngine::new(),
        );
        let orchestrator = Arc::new(Orchestrator::new(
            vec![page],
            builder,
            root.join("templates"),
            root.join("assets"),
        ));
        let config = DevConfig {
            addr: "127.0.0.1:0".parse().unwrap(),
            open: false,
            timing: DebounceTiming::from_millis(50, 0),
            reload_delay: Duration::from_millis(20),
            reattach_delay: Duration::from_millis(60),
        };
        let targets = WatchTargets {
            template_dir: root.join("templates"),
            assets_dir: root.join("assets"),
            config_file: None,
            output_dir: root.join("dist"),
            ignore: vec![],
        };
        let state = Arc::new(DevServerState::new(root.join("dist")));
        Coordinator::new(orchestrator, state, config, targets)
    }

    #[tokio::test]
    async fn test_cycle_broadcasts_lifecycle_and_reattaches() {
        let temp = TempDir::new().unwrap();
        let (coordinator, mut rx) = setup(temp.path());
        coordinator.attach_watcher().unwrap();
        let (_id, mut client) = coordinator.state().register_client();
        assert_eq!(client.recv().await.unwrap(), r#"{"type":"connected"}"#);

        let outcome = coordinator.run_cycle().await;
        assert!(matches!(outcome, CycleOutcome::Completed(ref r) if r.is_success()));
        assert!(!coordinator.is_watching());
        assert!(temp.path().join("dist/index.html").exists());

        assert_eq!(client.recv().await.unwrap(), r#"{"type":"build-start"}"#);
        let complete: serde_json::Value =
            serde_json::from_str(&client.recv().await.unwrap()).unwrap();
        assert_eq!(complete["type"], "build-complete");
        assert_eq!(client.recv().await.unwrap(), r#"{"type":"reload"}"#);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(coordinator.is_watching());
        // The build's own output never comes back as a request
        assert!(rx.try_recv().is_err());
        coordinator.shutdown();
        assert!(!coordinator.is_watching());
    }

    #[tokio::test]
    async fn test_cycle_while_building_is_busy_and_silent() {
        let temp = TempDir::new().unwrap();
        let (coordinator, _rx) = setup(temp.path());
        coordinator.attach_watcher().unwrap();
        let (_id, mut client) = coordinator.state().register_client();
        client.recv().await.unwrap();

        let guard = coordinator.orchestrator.try_begin().unwrap();
        assert!(coordinator.is_building());
        assert!(matches!(coordinator.run_cycle().await, CycleOutcome::Busy));
        drop(guard);

        assert!(coordinator.is_watching());
        assert!(client.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_reattach() {
        let temp = TempDir::new().unwrap();
        let (coordinator, _rx) = setup(temp.path());

        coordinator.run_cycle().await;
        coordinator.shutdown();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!coordinator.is_watching());
    }

    #[tokio::test]
    async fn test_edit_after_reattach_triggers_request() {
        let temp = TempDir::new().unwrap();
        let (coordinator, mut rx) = setup(temp.path());
        coordinator.attach_watcher().unwrap();
        // Let the baseline scan finish
        tokio::time::sleep(Duration::from_millis(200)).await;

        fs::write(temp.path().join("templates/index.html"), "<p>changed</p>").unwrap();
        let request = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("rebuild request")
            .unwrap();
        assert!(request
            .changes
            .iter()
            .any(|c| c.path.ends_with("templates/index.html")));
        coordinator.shutdown();
    }

    async fn slow_api() -> String {
        use axum::{routing::get, Json, Router};

        let app = Router::new().route(
            "/api/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(800)).await;
                Json(serde_json::json!({}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_abandoned_cycle_still_finishes_and_reattaches() {
        let temp = TempDir::new().unwrap();
        let api = ApiConfig {
            base_url: Some(slow_api().await),
            ..ApiConfig::default()
        };
        let page = PageDescriptor::new("index.html", "index.html")
            .with_endpoint("/api/slow", crate::config::HttpMethod::Get);
        let (coordinator, _rx) = setup_with(temp.path(), api, page);
        coordinator.attach_watcher().unwrap();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(200), coordinator.run_cycle()).await;
        assert!(abandoned.is_err());
        assert!(coordinator.is_building());
        assert!(!coordinator.is_watching());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!coordinator.is_building());
        assert!(coordinator.is_watching());
        assert!(temp.path().join("dist/index.html").exists());
        coordinator.shutdown();
    }
}
