//! Observer API server for the Vitalmap simulator.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/snapshots`) streaming every tick's
//!   snapshot via [`tokio::sync::broadcast`]
//! - **REST endpoints** for the latest snapshot, region table, totals,
//!   leaderboard, recent logs and run status
//! - **Operator endpoint** (`POST /api/operator/stop`) for a clean stop
//! - **Minimal HTML page** (`GET /`) with the current tick and totals
//!
//! # Architecture
//!
//! The observer never touches the simulator. The engine publishes each
//! snapshot into [`AppState`] and the handlers serve copies of it, so a
//! slow client cannot stall the tick loop.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError};
pub use startup::{StartupError, spawn_observer};
pub use state::AppState;
