//! Content-hash change detection.
//!
//! The detector remembers a blake3 hash for every watched file. An event only
//! counts as a change when the file's content actually differs from what was
//! last recorded, so touch-only saves and timestamp updates never rebuild.
//!
//! A removal leaves a short-lived tombstone holding the removed hash. When the
//! same path reappears with identical bytes before the tombstone expires
//! (atomic editor saves do exactly this), the pair cancels out.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

/// blake3 digest of a file's bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Hash a file, `None` when it does not exist (or is not a file).
    pub async fn of_file(path: &Path) -> std::io::Result<Option<Self>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(Self::of(&bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) if path.is_dir() => {
                tracing::trace!(path = %path.display(), error = %e, "skipping directory");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn of_file_blocking(path: &Path) -> std::io::Result<Option<Self>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(Self::of(&bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash(")?;
        for byte in &self.0[..6] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// Kind of a raw file-system event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
        }
    }
}

/// One file change that survived detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// What the detector decided about one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Content differs from the recorded state; pass it on
    Changed,
    /// Identical content; drop silently
    Suppressed,
    /// A removed file came back unchanged; retract the pending removal
    Restored,
}

#[derive(Debug)]
struct Tombstone {
    hash: ContentHash,
    expires: Instant,
}

/// Path to last-known content hash, plus removal tombstones.
#[derive(Debug)]
pub struct ChangeDetector {
    hashes: HashMap<PathBuf, ContentHash>,
    tombstones: HashMap<PathBuf, Tombstone>,
    tombstone_ttl: Duration,
    primed: bool,
}

impl ChangeDetector {
    /// `tombstone_ttl` is how long a removal may still be cancelled by an
    /// identical re-creation; the debounce window is the natural choice.
    pub fn new(tombstone_ttl: Duration) -> Self {
        Self {
            hashes: HashMap::new(),
            tombstones: HashMap::new(),
            tombstone_ttl,
            primed: false,
        }
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn tracked(&self) -> usize {
        self.hashes.len()
    }

    pub fn hash_of(&self, path: &Path) -> Option<ContentHash> {
        self.hashes.get(path).copied()
    }

    /// Take a full scan of the watched files.
    ///
    /// The first scan is the baseline: it is recorded and reports nothing.
    /// Later scans (after a watcher reattach) reconcile against the recorded
    /// state and report whatever changed while nobody was watching.
    pub fn scan(&mut self, files: Vec<(PathBuf, ContentHash)>) -> Vec<FileChange> {
        let mut current: HashMap<PathBuf, ContentHash> = files.into_iter().collect();

        if !self.primed {
            self.primed = true;
            tracing::debug!(files = current.len(), "watch baseline recorded");
            self.hashes = current;
            return Vec::new();
        }

        let mut changes = Vec::new();
        for (path, hash) in &current {
            match self.hashes.get(path) {
                Some(known) if known == hash => {}
                Some(_) => changes.push(FileChange::new(path.clone(), ChangeKind::Modified)),
                None => changes.push(FileChange::new(path.clone(), ChangeKind::Created)),
            }
        }
        for path in self.hashes.keys() {
            if !current.contains_key(path) {
                changes.push(FileChange::new(path.clone(), ChangeKind::Removed));
            }
        }
        changes.sort_by(|a, b| a.path.cmp(&b.path));

        std::mem::swap(&mut self.hashes, &mut current);
        self.tombstones.clear();
        changes
    }

    /// Classify one raw event.
    ///
    /// `hash` is the file's current content hash, or `None` if it is gone.
    pub fn observe(&mut self, path: &Path, kind: ChangeKind, hash: Option<ContentHash>) -> Verdict {
        self.expire_tombstones();

        match hash {
            Some(hash) => {
                if kind == ChangeKind::Removed {
                    tracing::trace!(path = %path.display(), "removed path already recreated");
                }
                self.observe_content(path, hash)
            }
            None => self.observe_removal(path),
        }
    }

    fn observe_removal(&mut self, path: &Path) -> Verdict {
        match self.hashes.remove(path) {
            Some(hash) => {
                self.tombstones.insert(
                    path.to_path_buf(),
                    Tombstone {
                        hash,
                        expires: Instant::now() + self.tombstone_ttl,
                    },
                );
                Verdict::Changed
            }
            None => {
                // A removed directory takes its tracked files with it
                let before = self.hashes.len();
                self.hashes.retain(|tracked, _| !tracked.starts_with(path));
                if self.hashes.len() < before {
                    Verdict::Changed
                } else {
                    Verdict::Suppressed
                }
            }
        }
    }

    fn observe_content(&mut self, path: &Path, hash: ContentHash) -> Verdict {
        if let Some(tombstone) = self.tombstones.remove(path) {
            self.hashes.insert(path.to_path_buf(), hash);
            return if tombstone.hash == hash {
                Verdict::Restored
            } else {
                Verdict::Changed
            };
        }

        match self.hashes.insert(path.to_path_buf(), hash) {
            Some(previous) if previous == hash => Verdict::Suppressed,
            _ => Verdict::Changed,
        }
    }

    fn expire_tombstones(&mut self) {
        let now = Instant::now();
        self.tombstones.retain(|_, t| t.expires > now);
    }
}
