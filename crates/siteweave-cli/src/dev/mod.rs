//! Development mode.
//!
//! - `detect`, `debounce`, `watcher`: turn file-system churn into debounced
//!   rebuild requests, suppressing content-identical events
//! - `coordinator`: runs one rebuild cycle at a time, detaching the watcher
//!   while the build writes output
//! - `server`, `state`: static serving plus the SSE live-reload channel

pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod detect;
pub mod server;
pub mod state;
pub mod watcher;

pub use config::DevConfig;
pub use coordinator::{Coordinator, CycleOutcome};
pub use debounce::{DebounceTiming, Debouncer};
pub use detect::{ChangeDetector, ChangeKind, ContentHash, FileChange, Verdict};
pub use server::DevServer;
pub use state::{BuildStatus, DevServerState, SharedState};
pub use watcher::{RebuildRequest, SharedDetector, SiteWatcher, WatchFilter, WatchTargets};

use serde::{Deserialize, Serialize};

/// Messages on the live-reload channel, one JSON object per SSE `data:` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum DevEvent {
    /// First message on every new connection
    Connected,

    BuildStart,

    /// Rebuild ran to completion; individual pages may have failed
    BuildComplete {
        duration_ms: u64,
        pages: usize,
        failed: usize,
    },

    /// Rebuild could not run at all
    BuildError { message: String },

    /// Browsers should reload now
    Reload,
}

impl DevEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
