//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel for per-tick snapshots, the
//! latest snapshot served by the REST endpoints, the region table, and
//! an optional handle on the run control for the operator endpoints.

use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use vitalmap_core::control::RunControl;
use vitalmap_types::{EventStreamSnapshot, Region};

/// Capacity of the broadcast channel for snapshots.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for snapshot messages.
    pub tx: broadcast::Sender<Arc<EventStreamSnapshot>>,
    /// The most recent snapshot; `None` until the first tick.
    pub snapshot: Arc<RwLock<Option<Arc<EventStreamSnapshot>>>>,
    /// The region table the simulator was built with.
    pub regions: Arc<[Region]>,
    /// Run control (present when a driver loop is running).
    pub control: Option<Arc<RunControl>>,
}

impl AppState {
    /// Create application state with no snapshot and no run control.
    pub fn new(regions: Vec<Region>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(None)),
            regions: regions.into(),
            control: None,
        }
    }

    /// Create application state with run control attached.
    pub fn with_control(regions: Vec<Region>, control: Arc<RunControl>) -> Self {
        Self {
            control: Some(control),
            ..Self::new(regions)
        }
    }

    /// Subscribe to the snapshot broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EventStreamSnapshot>> {
        self.tx.subscribe()
    }

    /// Publish a snapshot to all connected clients.
    ///
    /// Returns the number of receivers that received the message, 0 if
    /// no clients are connected (this is not an error).
    pub fn broadcast(&self, snapshot: Arc<EventStreamSnapshot>) -> usize {
        // send fails only when there are zero receivers.
        self.tx.send(snapshot).unwrap_or(0)
    }

    /// Clone of the latest snapshot, if a tick has run.
    pub async fn latest(&self) -> Option<Arc<EventStreamSnapshot>> {
        self.snapshot.read().await.clone()
    }
}
