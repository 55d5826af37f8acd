//! Tick callback that publishes snapshots to the Observer API.
//!
//! After each tick the snapshot replaces the one served by the REST
//! endpoints and is broadcast to all connected `WebSocket` clients.

use std::sync::Arc;

use tracing::debug;
use vitalmap_core::runner::TickCallback;
use vitalmap_observer::state::AppState;
use vitalmap_types::EventStreamSnapshot;

/// Callback that bridges the driver loop to the Observer API.
pub struct ObserverCallback {
    state: Arc<AppState>,
}

impl ObserverCallback {
    /// Create a new observer callback backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl TickCallback for ObserverCallback {
    fn on_tick(&mut self, snapshot: &EventStreamSnapshot) {
        let shared = Arc::new(snapshot.clone());

        // try_write so a slow REST reader never stalls the loop; a skipped
        // update is replaced on the next tick.
        if let Ok(mut latest) = self.state.snapshot.try_write() {
            *latest = Some(Arc::clone(&shared));
        } else {
            debug!(tick = snapshot.tick, "Snapshot lock busy, skipping update");
        }

        let receivers = self.state.broadcast(shared);
        debug!(tick = snapshot.tick, receivers, "Snapshot broadcast sent");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use vitalmap_core::config::StreamConfig;
    use vitalmap_core::regions::default_regions;
    use vitalmap_core::simulator::EventStreamSimulator;

    use super::*;

    #[tokio::test]
    async fn publishes_latest_snapshot_and_broadcasts() {
        let state = Arc::new(AppState::new(default_regions()));
        let mut rx = state.subscribe();
        let mut callback = ObserverCallback::new(Arc::clone(&state));

        let mut sim =
            EventStreamSimulator::new(default_regions(), &StreamConfig::default(), 1).unwrap();
        let snapshot = sim.tick(Utc::now()).unwrap();
        callback.on_tick(&snapshot);

        let latest = state.latest().await.unwrap();
        assert_eq!(latest.tick, 1);
        assert_eq!(rx.recv().await.unwrap().tick, 1);
    }

    #[tokio::test]
    async fn busy_lock_skips_update_but_still_broadcasts() {
        let state = Arc::new(AppState::new(default_regions()));
        let mut rx = state.subscribe();
        let mut callback = ObserverCallback::new(Arc::clone(&state));

        let mut sim =
            EventStreamSimulator::new(default_regions(), &StreamConfig::default(), 1).unwrap();
        let snapshot = sim.tick(Utc::now()).unwrap();

        let reader = state.snapshot.read().await;
        callback.on_tick(&snapshot);
        assert!(reader.is_none());
        drop(reader);

        assert!(state.latest().await.is_none());
        assert_eq!(rx.recv().await.unwrap().tick, 1);
    }
}
