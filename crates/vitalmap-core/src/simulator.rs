//! The timed event-stream simulator.
//!
//! [`EventStreamSimulator`] owns a weighted region table, generates events
//! from independent per-category Bernoulli trials, keeps the events that
//! are still inside the visibility window, and returns an owned
//! [`EventStreamSnapshot`] from every [`tick`](EventStreamSimulator::tick).
//!
//! # Tick contract
//!
//! 1. Each configured category (in [`Category`] order) draws one trial at
//!    its probability. Every success generates an event, appends it to the
//!    live set, and pushes a description to the combined log and to the
//!    log of the category's feed.
//! 2. On sweep ticks the live set keeps only events whose age is at most
//!    the TTL. Between sweeps an expired event may linger for up to
//!    `sweep_interval * tick_interval`.
//! 3. A snapshot of the live set, totals, logs and tallies is returned.
//!
//! The simulator never reads a clock of its own. Given the same seed,
//! configuration and sequence of `now` values, two simulators produce
//! identical snapshots.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use vitalmap_types::{
    Category, Event, EventId, EventStreamSnapshot, Feed, LiveEvent, LogEntry, Region, RegionTally,
};

use crate::clock::TickClock;
use crate::config::{SimulationConfig, StreamConfig};
use crate::error::SimulatorError;
use crate::recent_log::RecentLog;
use crate::regions::RegionTable;
use crate::totals::RunningTotals;

/// Seconds in one minute, for the log clock offset.
const SECONDS_PER_MINUTE: i32 = 60;

/// Format of the time prefix of every log line.
const LOG_TIME_FORMAT: &str = "%H:%M:%S";

/// One simulator session.
///
/// Not thread-safe by itself; each session owns its own instance and
/// drives it from one task.
#[derive(Debug)]
pub struct EventStreamSimulator {
    regions: RegionTable,
    categories: BTreeMap<Category, f64>,
    tick_interval: Duration,
    event_ttl: TimeDelta,
    log_offset: FixedOffset,
    clock: TickClock,
    rng: StdRng,
    last_event_id: EventId,
    live_events: Vec<Event>,
    totals: RunningTotals,
    recent_log: RecentLog,
    feed_logs: BTreeMap<Feed, RecentLog>,
}

impl EventStreamSimulator {
    /// Build a simulator over `regions` with the given stream parameters.
    ///
    /// # Errors
    ///
    /// - [`SimulatorError::EmptyRegionTable`] if no region can be drawn.
    /// - [`SimulatorError::Configuration`] for invalid weights, an empty
    ///   category set, a probability outside `[0, 1]`, a zero tick
    ///   interval, zero log capacity, a zero sweep interval, or an
    ///   out-of-range TTL or log clock offset.
    pub fn new(
        regions: Vec<Region>,
        config: &StreamConfig,
        seed: u64,
    ) -> Result<Self, SimulatorError> {
        if config.tick_interval_ms == 0 {
            return Err(SimulatorError::configuration(
                "tick_interval_ms must be greater than 0",
            ));
        }
        if config.log_capacity == 0 {
            return Err(SimulatorError::configuration(
                "log_capacity must be at least 1",
            ));
        }
        if config.categories.is_empty() {
            return Err(SimulatorError::configuration(
                "at least one category must be configured",
            ));
        }
        for (category, probability) in &config.categories {
            if !(0.0..=1.0).contains(probability) {
                return Err(SimulatorError::configuration(format!(
                    "probability for {category} must be within [0, 1], got {probability}"
                )));
            }
        }

        let event_ttl = i64::try_from(config.event_ttl_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .ok_or_else(|| SimulatorError::configuration("event_ttl_ms is out of range"))?;

        let log_offset = config
            .log_utc_offset_minutes
            .checked_mul(SECONDS_PER_MINUTE)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                SimulatorError::configuration("log_utc_offset_minutes must be within one day")
            })?;

        let clock = TickClock::new(config.expiry_sweep_interval_ticks)?;
        let regions = RegionTable::new(regions)?;

        let totals = RunningTotals::new(config.categories.keys().copied(), regions.len());
        let feed_logs = config
            .categories
            .keys()
            .map(|c| (c.feed(), RecentLog::new(config.log_capacity)))
            .collect();

        info!(
            regions = regions.len(),
            categories = config.categories.len(),
            tick_interval_ms = config.tick_interval_ms,
            event_ttl_ms = config.event_ttl_ms,
            sweep_interval = config.expiry_sweep_interval_ticks,
            seed,
            "event stream simulator initialized"
        );

        Ok(Self {
            regions,
            categories: config.categories.clone(),
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            event_ttl,
            log_offset,
            clock,
            rng: StdRng::seed_from_u64(seed),
            last_event_id: EventId::default(),
            live_events: Vec::new(),
            totals,
            recent_log: RecentLog::new(config.log_capacity),
            feed_logs,
        })
    }

    /// Build a simulator from a full configuration, using the built-in
    /// region table when none is configured.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimulatorError> {
        Self::new(config.regions_or_default(), &config.stream, config.world.seed)
    }

    /// Draw one region according to the weights.
    ///
    /// # Errors
    ///
    /// Cannot fail on a constructed simulator; the table was validated.
    pub fn sample_region(&mut self) -> Result<&Region, SimulatorError> {
        self.regions.sample(&mut self.rng)
    }

    /// Generate one event of `category` at `now` and count it.
    ///
    /// The event is returned but not added to the live set; [`tick`]
    /// does that.
    ///
    /// # Errors
    ///
    /// - [`SimulatorError::InvalidCategory`] if `category` is not configured.
    /// - [`SimulatorError::TickOverflow`] if the event sequence is exhausted.
    ///
    /// [`tick`]: Self::tick
    pub fn generate_event(
        &mut self,
        category: Category,
        now: DateTime<Utc>,
    ) -> Result<Event, SimulatorError> {
        if !self.categories.contains_key(&category) {
            return Err(SimulatorError::InvalidCategory { category });
        }

        let id = self
            .last_event_id
            .next()
            .ok_or(SimulatorError::TickOverflow)?;
        let (index, region) = self.regions.sample_indexed(&mut self.rng)?;
        let region_id = region.id.clone();

        if !self.totals.record(category, index) {
            return Err(SimulatorError::configuration(format!(
                "region {region_id} has no tally slot"
            )));
        }
        self.last_event_id = id;

        Ok(Event {
            id,
            category,
            region_id,
            created_at: now,
            color: category.color(),
        })
    }

    /// Advance one tick at time `now` and return the resulting snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::TickOverflow`] if the tick counter or the
    /// event sequence is exhausted.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<EventStreamSnapshot, SimulatorError> {
        let tick = self.clock.advance()?;

        let trials: Vec<(Category, f64)> =
            self.categories.iter().map(|(c, p)| (*c, *p)).collect();
        let mut generated: usize = 0;
        for (category, probability) in trials {
            if !self.rng.random_bool(probability) {
                continue;
            }
            let event = self.generate_event(category, now)?;
            if let Some(entry) = self.describe(&event) {
                if let Some(feed_log) = self.feed_logs.get_mut(&category.feed()) {
                    feed_log.push(entry.clone());
                }
                self.recent_log.push(entry);
            }
            self.live_events.push(event);
            generated = generated.saturating_add(1);
        }

        let mut expired: usize = 0;
        if self.clock.sweep_due() {
            let before = self.live_events.len();
            let ttl = self.event_ttl;
            self.live_events
                .retain(|event| now.signed_duration_since(event.created_at) <= ttl);
            expired = before.saturating_sub(self.live_events.len());
        }

        debug!(
            tick,
            generated,
            expired,
            live = self.live_events.len(),
            "tick complete"
        );

        Ok(self.snapshot(tick, now))
    }

    /// Human-readable log line for `event`.
    fn describe(&self, event: &Event) -> Option<LogEntry> {
        let region = self.regions.get(&event.region_id)?;
        let local = event.created_at.with_timezone(&self.log_offset);
        Some(LogEntry {
            text: format!(
                "{} - {} {}",
                local.format(LOG_TIME_FORMAT),
                region.name,
                event.category.log_phrase()
            ),
            color: event.color,
            category: event.category,
            at: event.created_at,
        })
    }

    /// Owned copy of the current state as seen at `now`.
    fn snapshot(&self, tick: u64, now: DateTime<Utc>) -> EventStreamSnapshot {
        let live_events = self
            .live_events
            .iter()
            .filter_map(|event| {
                let region = self.regions.get(&event.region_id)?;
                Some(LiveEvent {
                    id: event.id,
                    category: event.category,
                    region_id: event.region_id.clone(),
                    region_name: region.name.clone(),
                    lat: region.lat,
                    lon: region.lon,
                    color: event.color,
                    radius_m: event.category.feed().marker_radius_m(),
                    age_seconds: age_seconds(now, event.created_at),
                })
            })
            .collect();

        EventStreamSnapshot {
            tick,
            taken_at: now,
            live_events,
            totals: self.totals.by_category().clone(),
            recent_log: self.recent_log.to_vec(),
            feed_logs: self
                .feed_logs
                .iter()
                .map(|(feed, log)| (*feed, log.to_vec()))
                .collect(),
            region_totals: self.totals.region_tallies(self.regions.as_slice()),
        }
    }

    /// The `limit` regions with the highest combined totals.
    pub fn leaderboard(&self, limit: usize) -> Vec<RegionTally> {
        self.totals.leaderboard(self.regions.as_slice(), limit)
    }

    /// Advisory pause between ticks.
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Number of ticks executed so far.
    pub const fn current_tick(&self) -> u64 {
        self.clock.tick()
    }

    /// The region table.
    pub const fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// Session totals.
    pub const fn totals(&self) -> &RunningTotals {
        &self.totals
    }

    /// Configured categories with their per-tick probabilities.
    pub const fn categories(&self) -> &BTreeMap<Category, f64> {
        &self.categories
    }

    /// Events currently in the live set (including any not yet swept).
    pub fn live_events(&self) -> &[Event] {
        &self.live_events
    }
}

/// Seconds from `created_at` to `now`, clamped at zero.
fn age_seconds(now: DateTime<Utc>, created_at: DateTime<Utc>) -> f64 {
    now.signed_duration_since(created_at)
        .to_std()
        .map_or(0.0, |age| age.as_secs_f64())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn t(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    fn two_regions() -> Vec<Region> {
        vec![
            Region::new("a", "Alpha", "", 30.0, 110.0, 1.0),
            Region::new("b", "Beta", "", 40.0, 120.0, 0.0),
        ]
    }

    fn stream(categories: &[(Category, f64)], ttl_ms: u64, sweep: u64, cap: usize) -> StreamConfig {
        StreamConfig {
            tick_interval_ms: 1_000,
            event_ttl_ms: ttl_ms,
            expiry_sweep_interval_ticks: sweep,
            log_capacity: cap,
            log_utc_offset_minutes: 0,
            categories: categories.iter().copied().collect(),
        }
    }

    #[test]
    fn single_region_scenario() {
        let config = stream(&[(Category::Death, 1.0)], 3_000, 1, 6);
        let mut sim = EventStreamSimulator::new(two_regions(), &config, 1).unwrap();

        let first = sim.tick(t(0)).unwrap();
        assert_eq!(first.tick, 1);
        assert_eq!(first.total(Category::Death), 1);
        assert_eq!(first.live_events.len(), 1);
        assert_eq!(first.live_events[0].region_id.as_str(), "a");
        let first_id = first.live_events[0].id;

        let second = sim.tick(t(4)).unwrap();
        assert_eq!(second.total(Category::Death), 2);
        assert!(second.live_events.iter().all(|e| e.id != first_id));
        assert_eq!(second.live_events.len(), 1);
        assert!(second.live_events.iter().all(|e| e.region_id.as_str() == "a"));
    }

    #[test]
    fn log_keeps_most_recent_entries_newest_first() {
        let config = stream(&[(Category::BirthMale, 1.0)], 3_000, 1, 3);
        let mut sim = EventStreamSimulator::new(two_regions(), &config, 1).unwrap();

        let mut snapshot = None;
        for s in 0..5 {
            snapshot = Some(sim.tick(t(s)).unwrap());
        }
        let snapshot = snapshot.unwrap();

        let texts: Vec<&str> = snapshot.recent_log.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "22:13:24 - Alpha welcomed a baby boy",
                "22:13:23 - Alpha welcomed a baby boy",
                "22:13:22 - Alpha welcomed a baby boy",
            ]
        );
    }

    #[test]
    fn log_prefix_uses_configured_offset() {
        let mut config = stream(&[(Category::BirthFemale, 1.0)], 3_000, 1, 3);
        config.log_utc_offset_minutes = 480;
        let mut sim = EventStreamSimulator::new(two_regions(), &config, 1).unwrap();

        let snapshot = sim.tick(t(0)).unwrap();
        let entry = snapshot.recent_log.first().unwrap();
        assert_eq!(entry.text, "06:13:20 - Alpha welcomed a baby girl");
        assert_eq!(entry.color, Category::BirthFemale.color());
    }

    #[test]
    fn event_visible_through_ttl_and_gone_after_staleness_bound() {
        let config = stream(&[(Category::Death, 1.0)], 3_000, 5, 6);
        let mut sim = EventStreamSimulator::new(two_regions(), &config, 1).unwrap();

        let first = sim.tick(t(0)).unwrap();
        let id = first.live_events[0].id;

        for s in 1..=12 {
            let snapshot = sim.tick(t(s)).unwrap();
            let present = snapshot.live_events.iter().any(|e| e.id == id);
            if s <= 3 {
                assert!(present, "event must be visible at age {s}s");
            }
            if s > 3 + 5 {
                assert!(!present, "event must be gone at age {s}s");
            }
        }
    }

    #[test]
    fn event_exactly_at_ttl_is_retained() {
        let config = stream(&[(Category::Death, 1.0)], 3_000, 1, 6);
        let mut sim = EventStreamSimulator::new(two_regions(), &config, 1).unwrap();

        let first = sim.tick(t(0)).unwrap();
        let id = first.live_events[0].id;
        let at_ttl = sim.tick(t(3)).unwrap();
        let event = at_ttl.live_events.iter().find(|e| e.id == id).unwrap();
        assert!((event.age_seconds - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn totals_increase_by_number_of_generated_events() {
        let config = stream(
            &[
                (Category::BirthMale, 0.3),
                (Category::BirthFemale, 0.3),
                (Category::Death, 0.5),
            ],
            3_000,
            2,
            6,
        );
        let mut sim = EventStreamSimulator::new(crate::regions::default_regions(), &config, 9)
            .unwrap();

        let mut previous = sim.tick(t(0)).unwrap();
        let mut seen: std::collections::BTreeSet<EventId> =
            previous.live_events.iter().map(|e| e.id).collect();
        for s in 1..50 {
            let snapshot = sim.tick(t(s)).unwrap();
            for category in Category::ALL {
                let fresh = snapshot
                    .live_events
                    .iter()
                    .filter(|e| e.category == category && !seen.contains(&e.id))
                    .count();
                let delta = snapshot.total(category) - previous.total(category);
                assert_eq!(delta, u64::try_from(fresh).unwrap());
            }
            seen.extend(snapshot.live_events.iter().map(|e| e.id));
            previous = snapshot;
        }
    }

    #[test]
    fn certain_categories_all_fire_in_the_same_tick() {
        let config = stream(&[(Category::BirthMale, 1.0), (Category::Death, 1.0)], 3_000, 1, 6);
        let mut sim = EventStreamSimulator::new(two_regions(), &config, 3).unwrap();

        let snapshot = sim.tick(t(0)).unwrap();
        assert_eq!(snapshot.total(Category::BirthMale), 1);
        assert_eq!(snapshot.total(Category::Death), 1);
        assert_eq!(snapshot.live_events.len(), 2);
        assert_eq!(snapshot.feed_logs[&Feed::Birth].len(), 1);
        assert_eq!(snapshot.feed_logs[&Feed::Death].len(), 1);
        assert_eq!(snapshot.recent_log.len(), 2);
    }

    #[test]
    fn zero_probability_category_never_fires() {
        let config = stream(&[(Category::BirthMale, 0.0), (Category::Death, 1.0)], 3_000, 1, 6);
        let mut sim = EventStreamSimulator::new(two_regions(), &config, 3).unwrap();
        for s in 0..20 {
            let snapshot = sim.tick(t(s)).unwrap();
            assert_eq!(snapshot.total(Category::BirthMale), 0);
            assert!(snapshot.feed_logs[&Feed::Birth].is_empty());
        }
    }

    #[test]
    fn same_seed_and_times_give_identical_snapshots() {
        let config = StreamConfig {
            log_utc_offset_minutes: 480,
            ..StreamConfig::default()
        };
        let regions = crate::regions::default_regions();
        let mut left = EventStreamSimulator::new(regions.clone(), &config, 2024).unwrap();
        let mut right = EventStreamSimulator::new(regions, &config, 2024).unwrap();

        for s in 0..40 {
            assert_eq!(left.tick(t(s)).unwrap(), right.tick(t(s)).unwrap());
        }
    }

    #[test]
    fn unconfigured_category_is_rejected() {
        let config = stream(&[(Category::Death, 1.0)], 3_000, 1, 6);
        let mut sim = EventStreamSimulator::new(two_regions(), &config, 1).unwrap();

        let err = sim.generate_event(Category::BirthMale, t(0)).unwrap_err();
        assert_eq!(
            err,
            SimulatorError::InvalidCategory {
                category: Category::BirthMale
            }
        );
        assert_eq!(sim.totals().get(Category::Death), 0);

        let event = sim.generate_event(Category::Death, t(0)).unwrap();
        assert_eq!(event.id, EventId(1));
        assert_eq!(event.color, Category::Death.color());
        assert_eq!(sim.totals().get(Category::Death), 1);
        assert_eq!(sim.sample_region().unwrap().id.as_str(), "a");
    }

    #[test]
    fn invalid_configuration_is_rejected_at_construction() {
        let valid = stream(&[(Category::Death, 0.5)], 3_000, 1, 6);

        let cases = [
            StreamConfig {
                tick_interval_ms: 0,
                ..valid.clone()
            },
            StreamConfig {
                log_capacity: 0,
                ..valid.clone()
            },
            StreamConfig {
                expiry_sweep_interval_ticks: 0,
                ..valid.clone()
            },
            StreamConfig {
                categories: BTreeMap::new(),
                ..valid.clone()
            },
            stream(&[(Category::Death, 1.5)], 3_000, 1, 6),
            stream(&[(Category::Death, f64::NAN)], 3_000, 1, 6),
            StreamConfig {
                log_utc_offset_minutes: 24 * 60,
                ..valid.clone()
            },
        ];
        for config in &cases {
            let err = EventStreamSimulator::new(two_regions(), config, 1).unwrap_err();
            assert!(
                matches!(err, SimulatorError::Configuration { .. }),
                "{config:?} gave {err:?}"
            );
        }

        let err = EventStreamSimulator::new(Vec::new(), &valid, 1).unwrap_err();
        assert_eq!(err, SimulatorError::EmptyRegionTable);
    }

    #[test]
    fn snapshot_carries_region_attributes_and_tallies() {
        let config = stream(&[(Category::BirthMale, 1.0)], 3_000, 1, 6);
        let mut sim = EventStreamSimulator::new(two_regions(), &config, 1).unwrap();
        sim.tick(t(0)).unwrap();
        let snapshot = sim.tick(t(1)).unwrap();

        let live = &snapshot.live_events[0];
        assert_eq!(live.region_name, "Alpha");
        assert!((live.lat - 30.0).abs() < f64::EPSILON);
        assert_eq!(live.radius_m, Feed::Birth.marker_radius_m());
        assert!((live.age_seconds - 1.0).abs() < f64::EPSILON);

        assert_eq!(snapshot.region_totals.len(), 2);
        assert_eq!(snapshot.region_totals[0].count(Category::BirthMale), 2);
        assert_eq!(snapshot.region_totals[1].total, 0);
        assert_eq!(sim.leaderboard(1)[0].region_id.as_str(), "a");
        assert_eq!(sim.current_tick(), 2);
        assert_eq!(sim.tick_interval(), Duration::from_secs(1));
    }
}
