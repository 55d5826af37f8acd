//! Shared type definitions for the Vitalmap simulator.
//!
//! This crate is the single source of truth for the data that flows from
//! the simulator to its consumers. Types defined here flow downstream to
//! `TypeScript` via `ts-rs` for a map dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Region keys and event sequence ids
//! - [`enums`] -- Event categories and display feeds
//! - [`structs`] -- Regions, events, log entries and the per-tick snapshot

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Category, Feed, UnknownFeed};
pub use ids::{EventId, RegionId};
pub use structs::{Event, EventStreamSnapshot, LiveEvent, LogEntry, Region, RegionTally, Rgba};
