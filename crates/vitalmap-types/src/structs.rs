//! Core data structs: regions, events, log entries and the per-tick
//! snapshot handed to consumers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Category, Feed};
use crate::ids::{EventId, RegionId};

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel (255 is opaque).
    pub a: u8,
}

impl Rgba {
    /// Build a color from its four channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// CSS hex notation of the opaque color (`#rrggbb`).
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// A sampling bucket: a named place on the map with a relative weight.
///
/// Regions are fixed for the lifetime of a simulator. Events refer to them
/// by [`RegionId`] and never copy-and-mutate them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Region {
    /// Stable key of the region.
    pub id: RegionId,
    /// Display name (Latin script).
    pub name: String,
    /// Name in the local script.
    #[serde(default)]
    pub local_name: String,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Relative sampling weight. Zero means the region is never selected.
    pub weight: f64,
}

impl Region {
    /// Convenience constructor used by region tables and tests.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        local_name: impl Into<String>,
        lat: f64,
        lon: f64,
        weight: f64,
    ) -> Self {
        Self {
            id: RegionId::new(id),
            name: name.into(),
            local_name: local_name.into(),
            lat,
            lon,
            weight,
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// One simulated occurrence. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Session-unique sequence id.
    pub id: EventId,
    /// What happened.
    pub category: Category,
    /// Where it happened.
    pub region_id: RegionId,
    /// When it was generated (caller-supplied clock).
    pub created_at: DateTime<Utc>,
    /// Display color, derived from the category.
    pub color: Rgba,
}

/// A live event as seen by a renderer: region attributes resolved and the
/// age computed against the snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LiveEvent {
    /// Session-unique sequence id.
    pub id: EventId,
    /// What happened.
    pub category: Category,
    /// Where it happened.
    pub region_id: RegionId,
    /// Display name of the region.
    pub region_name: String,
    /// Latitude of the region.
    pub lat: f64,
    /// Longitude of the region.
    pub lon: f64,
    /// Marker color.
    pub color: Rgba,
    /// Suggested marker radius in meters.
    pub radius_m: u32,
    /// Seconds between creation and the snapshot time (never negative).
    pub age_seconds: f64,
}

// ---------------------------------------------------------------------------
// Log and tallies
// ---------------------------------------------------------------------------

/// A human-readable line in a recent-events log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LogEntry {
    /// Formatted description, e.g. `08:00:01 - Hebei welcomed a baby girl`.
    pub text: String,
    /// Color of the event the line describes.
    pub color: Rgba,
    /// Category of the event the line describes.
    pub category: Category,
    /// Creation time of the event.
    pub at: DateTime<Utc>,
}

/// Running counts for a single region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RegionTally {
    /// The region counted.
    pub region_id: RegionId,
    /// Display name of the region.
    pub name: String,
    /// Local-script name of the region.
    pub local_name: String,
    /// Count per category. Categories that never fired are absent.
    pub counts: BTreeMap<Category, u64>,
    /// Sum over all categories.
    pub total: u64,
}

impl RegionTally {
    /// Count for one category (zero if it never fired here).
    pub fn count(&self, category: Category) -> u64 {
        self.counts.get(&category).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything a consumer needs to redraw after one tick.
///
/// Snapshots are owned copies; consumers may keep them around or throw them
/// away without affecting the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventStreamSnapshot {
    /// Tick number that produced the snapshot (1 for the first tick).
    pub tick: u64,
    /// The `now` passed to the tick.
    pub taken_at: DateTime<Utc>,
    /// Events still inside the visibility window, oldest first.
    pub live_events: Vec<LiveEvent>,
    /// Session totals per configured category.
    pub totals: BTreeMap<Category, u64>,
    /// Most-recent-first log across all categories.
    pub recent_log: Vec<LogEntry>,
    /// Most-recent-first log per feed.
    pub feed_logs: BTreeMap<Feed, Vec<LogEntry>>,
    /// Per-region counts, in region table order.
    pub region_totals: Vec<RegionTally>,
}

impl EventStreamSnapshot {
    /// Session total for one category (zero if not configured).
    pub fn total(&self, category: Category) -> u64 {
        self.totals.get(&category).copied().unwrap_or(0)
    }

    /// Live events belonging to one feed.
    pub fn live_events_on(&self, feed: Feed) -> impl Iterator<Item = &LiveEvent> {
        self.live_events
            .iter()
            .filter(move |event| event.category.feed() == feed)
    }
}
