//! Tick counting and time sources.
//!
//! The simulator never reads a global clock. The driver asks a
//! [`TimeSource`] for `now` and passes it to
//! [`EventStreamSimulator::tick`](crate::simulator::EventStreamSimulator::tick).
//! [`TickClock`] counts ticks and decides when the expiry sweep runs.
//!
//! - Ticks are counted from 1: the first call to [`TickClock::advance`]
//!   returns 1.
//! - With a sweep interval of `n` the sweep runs on ticks `n, 2n, 3n, ...`.
//! - All counter arithmetic is checked.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::error::SimulatorError;

/// Tick counter with sweep scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickClock {
    /// Number of ticks executed so far.
    tick: u64,

    /// Run the expiry sweep every this many ticks (at least 1).
    sweep_interval: u64,
}

impl TickClock {
    /// Create a clock at tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Configuration`] if `sweep_interval` is 0.
    pub fn new(sweep_interval: u64) -> Result<Self, SimulatorError> {
        if sweep_interval == 0 {
            return Err(SimulatorError::configuration(
                "expiry_sweep_interval_ticks must be at least 1",
            ));
        }
        Ok(Self {
            tick: 0,
            sweep_interval,
        })
    }

    /// Number of ticks executed so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Advance to the next tick and return its number.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::TickOverflow`] if the counter is at
    /// `u64::MAX`.
    pub const fn advance(&mut self) -> Result<u64, SimulatorError> {
        match self.tick.checked_add(1) {
            Some(next) => {
                self.tick = next;
                Ok(next)
            }
            None => Err(SimulatorError::TickOverflow),
        }
    }

    /// Whether the current tick is a sweep tick.
    pub const fn sweep_due(&self) -> bool {
        match self.tick.checked_rem(self.sweep_interval) {
            Some(rem) => self.tick != 0 && rem == 0,
            None => false,
        }
    }
}

/// Source of the `now` timestamp handed to each tick.
pub trait TimeSource: Send + Sync {
    /// The current time according to this source.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic time source: returns `start`, then `start + step`, then
/// `start + 2 * step`, and so on, one step per read.
///
/// Used for replays and tests where the `now` sequence must be fixed.
#[derive(Debug)]
pub struct ManualTimeSource {
    next: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualTimeSource {
    /// Create a source starting at `start` and advancing by `step` per read.
    pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }

    /// The value the next call to [`TimeSource::now`] will return.
    pub fn peek(&self) -> DateTime<Utc> {
        match self.next.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        let mut guard = match self.next.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let current = *guard;
        // Saturate at the representable limit rather than wrap.
        *guard = current.checked_add_signed(self.step).unwrap_or(current);
        current
    }
}
