//! Debouncing of detected changes.
//!
//! Pure timing state: changes are collected per path and released as one
//! batch once no new change has arrived for the quiet window, and no earlier
//! batch was released within the cooldown.

use crate::dev::detect::{ChangeKind, FileChange};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

/// Quiet period and post-release cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTiming {
    pub window: Duration,
    pub cooldown: Duration,
}

impl DebounceTiming {
    pub fn from_millis(window_ms: u64, cooldown_ms: u64) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            cooldown: Duration::from_millis(cooldown_ms),
        }
    }
}

#[derive(Debug)]
pub struct Debouncer {
    timing: DebounceTiming,
    /// Sorted so batches come out in a stable order
    pending: BTreeMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
    last_release: Option<Instant>,
}

impl Debouncer {
    pub fn new(timing: DebounceTiming) -> Self {
        Self {
            timing,
            pending: BTreeMap::new(),
            last_event: None,
            last_release: None,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Record a change and restart the quiet window.
    ///
    /// Per-path merging:
    /// - Removed then Created/Modified: the file is back, keep the new kind
    /// - Modified then Removed: upgrade to Removed
    /// - Created then Removed: appeared and vanished, drop both
    /// - anything else: the first kind wins
    pub fn push(&mut self, change: FileChange) {
        let FileChange { path, kind } = change;

        match self.pending.get(&path).copied() {
            None => {
                self.pending.insert(path, kind);
            }
            Some(ChangeKind::Removed) if kind != ChangeKind::Removed => {
                self.pending.insert(path, kind);
            }
            Some(ChangeKind::Modified) if kind == ChangeKind::Removed => {
                self.pending.insert(path, ChangeKind::Removed);
            }
            Some(ChangeKind::Created) if kind == ChangeKind::Removed => {
                self.pending.remove(&path);
            }
            Some(_) => {}
        }

        self.last_event = if self.pending.is_empty() {
            None
        } else {
            Some(Instant::now())
        };
    }

    /// Withdraw a pending change for `path` (a removal that was undone).
    pub fn retract(&mut self, path: &Path) {
        if self.pending.remove(path).is_some() {
            tracing::debug!(path = %path.display(), "pending change retracted");
        }
        if self.pending.is_empty() {
            self.last_event = None;
        }
    }

    pub fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        if last_event.elapsed() < self.timing.window {
            return false;
        }
        if let Some(last_release) = self.last_release {
            if last_release.elapsed() < self.timing.cooldown {
                return false;
            }
        }
        !self.pending.is_empty()
    }

    /// Release the batch if the window and cooldown have both elapsed.
    pub fn take_if_ready(&mut self) -> Option<Vec<FileChange>> {
        if !self.is_ready() {
            return None;
        }

        let pending = std::mem::take(&mut self.pending);
        self.last_event = None;
        self.last_release = Some(Instant::now());

        Some(
            pending
                .into_iter()
                .map(|(path, kind)| FileChange { path, kind })
                .collect(),
        )
    }

    /// When to check again; `None` while nothing is pending.
    pub fn deadline(&self) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }
        let last_event = self.last_event?;
        let quiet = last_event + self.timing.window;
        let cooled = self
            .last_release
            .map(|t| t + self.timing.cooldown)
            .unwrap_or(quiet);
        Some(quiet.max(cooled))
    }
}
