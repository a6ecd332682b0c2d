//! Shared state for the development server.
//!
//! Tracks the last build outcome and the set of live-reload clients, using
//! parking_lot locks that are never held across an await.

use crate::dev::DevEvent;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Per-client buffer; a client this far behind misses events instead of
/// stalling the broadcast.
const CLIENT_BUFFER: usize = 32;

/// Build status tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// No build has been performed yet
    NotStarted,
    /// Build is currently in progress
    InProgress { started_at: Instant },
    /// Build finished; some pages may still have failed
    Success {
        duration_ms: u64,
        pages: usize,
        failed: usize,
    },
    /// Build aborted before producing results
    Failed { error: String },
}

impl BuildStatus {
    /// JSON view of the last build, as reported by `/health`.
    pub fn summary(&self) -> serde_json::Value {
        match self {
            BuildStatus::NotStarted => json!({ "state": "not-started" }),
            BuildStatus::InProgress { started_at } => json!({
                "state": "building",
                "elapsedMs": started_at.elapsed().as_millis() as u64,
            }),
            BuildStatus::Success {
                duration_ms,
                pages,
                failed,
            } => json!({
                "state": "complete",
                "durationMs": duration_ms,
                "pages": pages,
                "failed": failed,
            }),
            BuildStatus::Failed { error } => json!({ "state": "failed", "error": error }),
        }
    }
}

/// Live-reload subscribers: client id to its event channel.
pub type ClientRegistry = Arc<RwLock<HashMap<usize, mpsc::Sender<String>>>>;

/// Shared development server state.
pub struct DevServerState {
    /// Last build status
    pub status: RwLock<BuildStatus>,

    /// Connected SSE clients
    pub clients: ClientRegistry,

    /// Next client ID
    pub next_client_id: RwLock<usize>,

    /// Directory served to the browser
    pub out_dir: PathBuf,
}

impl DevServerState {
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: RwLock::new(0),
            out_dir,
        }
    }

    pub fn start_build(&self) {
        *self.status.write() = BuildStatus::InProgress {
            started_at: Instant::now(),
        };
    }

    pub fn complete_build(&self, duration_ms: u64, pages: usize, failed: usize) {
        *self.status.write() = BuildStatus::Success {
            duration_ms,
            pages,
            failed,
        };
    }

    pub fn fail_build(&self, error: String) {
        *self.status.write() = BuildStatus::Failed { error };
    }

    pub fn get_status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    /// Register a new SSE client.
    ///
    /// The returned receiver already holds the `connected` greeting.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        let _ = tx.try_send(DevEvent::Connected.to_json());
        self.clients.write().insert(id, tx);

        (id, rx)
    }

    /// Send an event to every connected client.
    ///
    /// Never blocks and never fails: a closed client is removed, a client
    /// with a full buffer skips this event.
    pub fn broadcast(&self, event: &DevEvent) -> usize {
        let json = event.to_json();

        let clients: Vec<(usize, mpsc::Sender<String>)> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in clients {
            match tx.try_send(json.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(client = id, "live-reload client lagging, event dropped");
                }
                Err(TrySendError::Closed(_)) => dead.push(id),
            }
        }

        if !dead.is_empty() {
            let mut registry = self.clients.write();
            for id in dead {
                registry.remove(&id);
                tracing::debug!(client = id, "live-reload client disconnected");
            }
        }

        delivered
    }

    /// Drop every client sender, ending their event streams.
    pub fn close_all_clients(&self) -> usize {
        let mut registry = self.clients.write();
        let count = registry.len();
        registry.clear();
        count
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    pub fn get_out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl Default for DevServerState {
    fn default() -> Self {
        Self::new(crate::config::default_output_dir())
    }
}

/// Shared state handle for passing around the application.
pub type SharedState = Arc<DevServerState>;
