//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/snapshots` -- `WebSocket` snapshot stream
/// - `GET /api/snapshot` -- latest snapshot
/// - `GET /api/regions` -- region table
/// - `GET /api/regions/{id}` -- single region with tallies
/// - `GET /api/totals` -- totals per category
/// - `GET /api/leaderboard` -- top regions
/// - `GET /api/log` -- recent log
/// - `GET /api/status` -- run status
/// - `POST /api/operator/stop` -- request a clean stop
///
/// CORS allows any origin so a dashboard can be served from elsewhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/snapshots", get(ws::ws_snapshots))
        // REST API
        .route("/api/snapshot", get(handlers::get_snapshot))
        .route("/api/regions", get(handlers::list_regions))
        .route("/api/regions/{id}", get(handlers::get_region))
        .route("/api/totals", get(handlers::get_totals))
        .route("/api/leaderboard", get(handlers::leaderboard))
        .route("/api/log", get(handlers::get_log))
        .route("/api/status", get(handlers::status))
        // Operator
        .route("/api/operator/stop", post(handlers::stop))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
