//! Enumeration types for the Vitalmap simulator.
//!
//! [`Category`] is the kind of a simulated occurrence; [`Feed`] groups
//! categories into the two display panels (births and deaths).

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::Rgba;

/// Marker radius hint for birth events, in meters.
const BIRTH_MARKER_RADIUS_M: u32 = 80_000;

/// Marker radius hint for death events, in meters.
const DEATH_MARKER_RADIUS_M: u32 = 30_000;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The kind of a simulated event.
///
/// Categories are independent: each configured category gets its own
/// Bernoulli trial per tick, so several may fire in the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum Category {
    /// A baby boy was born.
    BirthMale,
    /// A baby girl was born.
    BirthFemale,
    /// A resident died.
    Death,
}

impl Category {
    /// Every category, in trial order.
    pub const ALL: [Self; 3] = [Self::BirthMale, Self::BirthFemale, Self::Death];

    /// The display panel this category belongs to.
    pub const fn feed(self) -> Feed {
        match self {
            Self::BirthMale | Self::BirthFemale => Feed::Birth,
            Self::Death => Feed::Death,
        }
    }

    /// Marker color for events of this category.
    pub const fn color(self) -> Rgba {
        match self {
            Self::BirthMale => Rgba::new(0, 255, 255, 200),
            Self::BirthFemale => Rgba::new(255, 0, 255, 200),
            Self::Death => Rgba::new(248, 113, 113, 200),
        }
    }

    /// Predicate used in human-readable log lines.
    pub const fn log_phrase(self) -> &'static str {
        match self {
            Self::BirthMale => "welcomed a baby boy",
            Self::BirthFemale => "welcomed a baby girl",
            Self::Death => "lost a resident",
        }
    }

    /// Wire name of the category (`BIRTH_MALE`, ...).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BirthMale => "BIRTH_MALE",
            Self::BirthFemale => "BIRTH_FEMALE",
            Self::Death => "DEATH",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// A display panel grouping related categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Feed {
    /// Births of either sex.
    Birth,
    /// Deaths.
    Death,
}

impl Feed {
    /// Suggested marker radius in meters for events on this feed.
    pub const fn marker_radius_m(self) -> u32 {
        match self {
            Self::Birth => BIRTH_MARKER_RADIUS_M,
            Self::Death => DEATH_MARKER_RADIUS_M,
        }
    }

    /// Lowercase name of the feed.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Birth => "birth",
            Self::Death => "death",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known [`Feed`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feed: {0}")]
pub struct UnknownFeed(pub String);

impl FromStr for Feed {
    type Err = UnknownFeed;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "birth" | "births" => Ok(Self::Birth),
            "death" | "deaths" => Ok(Self::Death),
            other => Err(UnknownFeed(other.to_owned())),
        }
    }
}
