//! File system watcher feeding the change detector.
//!
//! A [`SiteWatcher`] owns one notify watcher and one worker task. The notify
//! callback only forwards raw events into a channel; the worker filters
//! them, hashes the affected files, asks the shared [`ChangeDetector`]
//! whether anything really changed, and debounces the survivors into
//! [`RebuildRequest`]s.
//!
//! Detaching is dropping the watcher. The detector outlives it, so a fresh
//! watcher attached later reconciles against the hashes recorded before.

use crate::config::SiteConfig;
use crate::dev::debounce::{DebounceTiming, Debouncer};
use crate::dev::detect::{ChangeDetector, ChangeKind, ContentHash, FileChange, Verdict};
use crate::error::WatchError;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

/// Detector state shared by every watcher instance of one dev session.
pub type SharedDetector = Arc<Mutex<ChangeDetector>>;

/// Always excluded, on top of `dev.watchIgnore`.
pub const DEFAULT_IGNORE: &[&str] = &["node_modules", ".git", "*.log", "*.swp", "*~"];

/// A debounced batch of real changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildRequest {
    pub changes: Vec<FileChange>,
}

impl RebuildRequest {
    pub fn touches(&self, path: &Path) -> bool {
        self.changes.iter().any(|c| c.path == path)
    }
}

/// What to watch and what to leave alone.
#[derive(Debug, Clone)]
pub struct WatchTargets {
    pub template_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub config_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub ignore: Vec<String>,
}

impl WatchTargets {
    pub fn from_config(config: &SiteConfig, config_file: Option<&Path>) -> Self {
        Self {
            template_dir: config.paths.template_dir.clone(),
            assets_dir: config.paths.assets_dir.clone(),
            config_file: config_file.map(Path::to_path_buf),
            output_dir: config.paths.output_dir.clone(),
            ignore: config.dev.watch_ignore.clone(),
        }
    }
}

/// Path filter over canonicalized watch roots.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    roots: Vec<PathBuf>,
    config_file: Option<PathBuf>,
    output_dir: PathBuf,
    patterns: Vec<String>,
}

impl WatchFilter {
    pub fn new(targets: &WatchTargets) -> Self {
        let mut roots = vec![canonical(&targets.template_dir)];
        if targets.assets_dir.is_dir() {
            roots.push(canonical(&targets.assets_dir));
        }

        let patterns = DEFAULT_IGNORE
            .iter()
            .map(|p| p.to_string())
            .chain(targets.ignore.iter().cloned())
            .collect();

        Self {
            roots,
            config_file: targets.config_file.as_deref().map(canonical),
            output_dir: canonical(&targets.output_dir),
            patterns,
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Whether events for `path` must be dropped.
    pub fn should_ignore(&self, path: &Path) -> bool {
        if self.config_file.as_deref() == Some(path) {
            return false;
        }

        // The build writes here; watching it would rebuild forever
        if path.starts_with(&self.output_dir) {
            return true;
        }

        let Some(rel_path) = self
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
        else {
            return true;
        };

        let path_str = rel_path.to_string_lossy();
        for pattern in &self.patterns {
            if let Some(suffix) = pattern.strip_prefix('*') {
                if path_str.ends_with(suffix) {
                    return true;
                }
            } else if rel_path.starts_with(pattern)
                || rel_path.components().any(|c| c.as_os_str() == pattern.as_str())
            {
                return true;
            }
        }

        // Hidden files and directories, staging roots included
        rel_path.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }

    /// Hash every watched file. Blocking; run it off the async threads.
    pub fn scan_files(&self) -> Vec<(PathBuf, ContentHash)> {
        let mut files = Vec::new();

        for root in &self.roots {
            let walker = WalkDir::new(root)
                .into_iter()
                .filter_entry(|e| e.path() == root.as_path() || !self.should_ignore(e.path()));
            for entry in walker.filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }
                match ContentHash::of_file_blocking(entry.path()) {
                    Ok(Some(hash)) => files.push((entry.path().to_path_buf(), hash)),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(path = %entry.path().display(), error = %e, "cannot hash file")
                    }
                }
            }
        }

        if let Some(ref config_file) = self.config_file {
            if let Ok(Some(hash)) = ContentHash::of_file_blocking(config_file) {
                files.push((config_file.clone(), hash));
            }
        }

        files
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// A live watcher. Dropping it stops observation.
pub struct SiteWatcher {
    _watcher: RecommendedWatcher,
    worker: JoinHandle<()>,
    filter: Arc<WatchFilter>,
}

impl SiteWatcher {
    /// Start watching and spawn the worker.
    ///
    /// Must be called inside a tokio runtime. The worker first scans the
    /// watched tree: the first scan of a detector is its baseline, later ones
    /// report what changed while no watcher was attached.
    pub fn attach(
        targets: &WatchTargets,
        detector: SharedDetector,
        timing: DebounceTiming,
        requests: mpsc::Sender<RebuildRequest>,
    ) -> Result<Self, WatchError> {
        if !targets.template_dir.is_dir() {
            return Err(WatchError::MissingRoot(targets.template_dir.clone()));
        }

        let filter = Arc::new(WatchFilter::new(targets));
        let (raw_tx, raw_rx) = mpsc::channel(256);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the watcher is being torn down
            let _ = raw_tx.blocking_send(res);
        })?;

        for root in filter.roots() {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }
        if let Some(parent) = filter.config_file().and_then(Path::parent) {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        tracing::debug!(roots = ?filter.roots(), "watcher attached");

        let worker = tokio::spawn(run_worker(
            raw_rx,
            Arc::clone(&filter),
            detector,
            timing,
            requests,
        ));

        Ok(Self {
            _watcher: watcher,
            worker,
            filter,
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        self.filter.roots()
    }
}

impl Drop for SiteWatcher {
    fn drop(&mut self) {
        self.worker.abort();
        tracing::debug!("watcher detached");
    }
}

async fn run_worker(
    mut raw_rx: mpsc::Receiver<notify::Result<Event>>,
    filter: Arc<WatchFilter>,
    detector: SharedDetector,
    timing: DebounceTiming,
    requests: mpsc::Sender<RebuildRequest>,
) {
    let mut debouncer = Debouncer::new(timing);

    let scan_filter = Arc::clone(&filter);
    let files = match tokio::task::spawn_blocking(move || scan_filter.scan_files()).await {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(error = %e, "initial watch scan failed");
            Vec::new()
        }
    };
    let missed = detector.lock().scan(files);
    if !missed.is_empty() {
        tracing::info!(changes = missed.len(), "changes made while the watcher was detached");
    }
    for change in missed {
        debouncer.push(change);
    }
    tracing::debug!(tracked = detector.lock().tracked(), "watcher ready");

    loop {
        let deadline = debouncer.deadline();
        tokio::select! {
            event = raw_rx.recv() => match event {
                Some(Ok(event)) => handle_event(event, &filter, &detector, &mut debouncer).await,
                Some(Err(e)) => tracing::warn!(error = %e, "file watch error"),
                None => break,
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(tokio::time::Instant::now)), if deadline.is_some() => {
                let Some(changes) = debouncer.take_if_ready() else {
                    continue;
                };
                match requests.try_send(RebuildRequest { changes }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(request)) => {
                        // A rebuild is still running; retry after the next window
                        tracing::debug!("rebuild in progress, deferring changes");
                        for change in request.changes {
                            debouncer.push(change);
                        }
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        }
    }
}

async fn handle_event(
    event: Event,
    filter: &WatchFilter,
    detector: &SharedDetector,
    debouncer: &mut Debouncer,
) {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Removed,
        // mtime/atime/chmod noise
        EventKind::Modify(ModifyKind::Metadata(_)) => return,
        EventKind::Modify(_) => ChangeKind::Modified,
        _ => return,
    };

    for path in event.paths {
        if filter.should_ignore(&path) || path.is_dir() {
            continue;
        }

        let hash = match ContentHash::of_file(&path).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot hash changed file");
                continue;
            }
        };

        let effective = match (kind, hash) {
            (_, None) => ChangeKind::Removed,
            (ChangeKind::Removed, Some(_)) => ChangeKind::Modified,
            (kind, Some(_)) => kind,
        };

        let verdict = detector.lock().observe(&path, effective, hash);
        match verdict {
            Verdict::Changed => {
                tracing::debug!(path = %path.display(), kind = effective.label(), "change detected");
                debouncer.push(FileChange::new(path, effective));
            }
            Verdict::Restored => debouncer.retract(&path),
            Verdict::Suppressed => {}
        }
    }
}
