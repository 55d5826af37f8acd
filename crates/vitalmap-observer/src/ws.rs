//! `WebSocket` handler for real-time snapshot streaming.
//!
//! Clients connect to `GET /ws/snapshots`. A renderer needs a full frame
//! to draw, so the latest snapshot is sent as soon as the connection
//! opens; after that every tick's snapshot follows as JSON text.
//!
//! Snapshots are sent in tick order. One published while the client was
//! connecting may arrive both as the catch-up frame and on the broadcast
//! channel; the second copy is dropped. A lagging client skips ahead to
//! the newest snapshot.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use vitalmap_types::EventStreamSnapshot;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming snapshots.
///
/// # Route
///
/// `GET /ws/snapshots`
pub async fn ws_snapshots(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// One client's position in the snapshot stream.
struct SnapshotFeed {
    rx: broadcast::Receiver<Arc<EventStreamSnapshot>>,
    last_sent_tick: Option<u64>,
}

impl SnapshotFeed {
    /// Subscribe first, then read the latest snapshot, so no tick falls
    /// between the catch-up frame and the live stream.
    async fn open(state: &AppState) -> (Self, Option<Arc<EventStreamSnapshot>>) {
        let rx = state.subscribe();
        let latest = state.latest().await;
        (
            Self {
                rx,
                last_sent_tick: None,
            },
            latest,
        )
    }

    /// Whether `snapshot` is newer than anything sent so far. Records it
    /// as sent when it is.
    fn admit(&mut self, snapshot: &EventStreamSnapshot) -> bool {
        if self.last_sent_tick.is_some_and(|sent| snapshot.tick <= sent) {
            return false;
        }
        self.last_sent_tick = Some(snapshot.tick);
        true
    }
}

/// JSON text frame for `snapshot`, or `None` if it cannot be encoded.
fn encode(snapshot: &EventStreamSnapshot) -> Option<Message> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!(tick = snapshot.tick, error = %e, "Failed to serialize snapshot");
            None
        }
    }
}

/// Send `snapshot` if it moves the client forward. Returns `false` once
/// the client is gone.
async fn push(socket: &mut WebSocket, feed: &mut SnapshotFeed, snapshot: &EventStreamSnapshot) -> bool {
    if !feed.admit(snapshot) {
        return true;
    }
    let Some(frame) = encode(snapshot) else {
        return true;
    };
    socket.send(frame).await.is_ok()
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (mut feed, latest) = SnapshotFeed::open(&state).await;
    debug!(
        catch_up_tick = latest.as_ref().map(|s| s.tick),
        "WebSocket client connected"
    );

    if let Some(snapshot) = latest
        && !push(&mut socket, &mut feed, &snapshot).await
    {
        debug!("WebSocket client disconnected before catch-up");
        return;
    }

    loop {
        tokio::select! {
            result = feed.rx.recv() => match result {
                Ok(snapshot) => {
                    if !push(&mut socket, &mut feed, &snapshot).await {
                        debug!(tick = snapshot.tick, "WebSocket client disconnected (send failed)");
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "WebSocket client lagged, skipping ahead");
                }
                Err(RecvError::Closed) => {
                    debug!("Snapshot channel closed, shutting down WebSocket");
                    return;
                }
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => {
                    debug!("WebSocket client disconnected");
                    return;
                }
                // Inbound text and binary frames are ignored.
                Some(Ok(_)) => {}
            },
        }
    }
}
