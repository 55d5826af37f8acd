//! Driver loop with run controls.
//!
//! [`run_simulation`] paces an [`EventStreamSimulator`] on its tick
//! interval and hands every snapshot to a [`TickCallback`]. It supports:
//!
//! - **Bounded runs**: stop after `max_ticks` or `max_real_time_seconds`
//! - **Operator stop**: a stop request wakes the loop between ticks
//! - **Injected time**: `now` comes from a [`TimeSource`], so a run can be
//!   replayed exactly with [`ManualTimeSource`](crate::clock::ManualTimeSource)
//!
//! Pacing is best effort. A slow tick delays the next one rather than
//! triggering a burst of catch-up ticks.

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use vitalmap_types::EventStreamSnapshot;

use crate::clock::TimeSource;
use crate::control::{RunControl, SimulationEndReason};
use crate::error::SimulatorError;
use crate::simulator::EventStreamSimulator;

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick failed.
    #[error("tick error: {source}")]
    Simulator {
        /// The underlying simulator error.
        #[from]
        source: SimulatorError,
    },
}

/// Outcome of a run.
#[derive(Debug)]
pub struct RunResult {
    /// Why the run ended.
    pub end_reason: SimulationEndReason,
    /// Number of ticks executed.
    pub total_ticks: u64,
    /// The last snapshot, if any tick ran.
    pub final_snapshot: Option<EventStreamSnapshot>,
}

/// Consumer of per-tick snapshots.
///
/// Implementations must absorb their own failures (log and move on); the
/// loop does not look at what the callback did.
pub trait TickCallback: Send {
    /// Called after each successful tick.
    fn on_tick(&mut self, snapshot: &EventStreamSnapshot);
}

/// A callback that ignores every snapshot.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _snapshot: &EventStreamSnapshot) {}
}

/// Run the simulator until a bound is hit or a stop is requested.
///
/// Each iteration checks for a stop and the real-time limit, reads `now`
/// from `time_source`, ticks, notifies `callback`, checks the tick limit,
/// and then waits for the next interval or a stop, whichever comes first.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick fails.
pub async fn run_simulation(
    simulator: &mut EventStreamSimulator,
    control: &Arc<RunControl>,
    time_source: &dyn TimeSource,
    callback: &mut dyn TickCallback,
) -> Result<RunResult, RunnerError> {
    let mut last_snapshot: Option<EventStreamSnapshot> = None;
    let mut total_ticks: u64 = 0;

    let mut interval = tokio::time::interval(simulator.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick completes immediately.
    interval.tick().await;

    info!(
        max_ticks = control.max_ticks(),
        max_real_time_seconds = control.max_real_time_seconds(),
        tick_interval = ?simulator.tick_interval(),
        "Simulation starting"
    );

    loop {
        if control.is_stop_requested() {
            info!("Operator stop requested");
            return Ok(finish(
                control,
                SimulationEndReason::OperatorStop,
                total_ticks,
                last_snapshot,
            )
            .await);
        }

        if control.time_limit_reached() {
            info!(
                max_seconds = control.max_real_time_seconds(),
                elapsed = control.elapsed_seconds(),
                "Real-time limit reached"
            );
            return Ok(finish(
                control,
                SimulationEndReason::MaxRealTimeReached,
                total_ticks,
                last_snapshot,
            )
            .await);
        }

        let snapshot = simulator.tick(time_source.now())?;
        total_ticks = total_ticks.saturating_add(1);

        callback.on_tick(&snapshot);

        if control.tick_limit_reached(snapshot.tick) {
            info!(
                tick = snapshot.tick,
                max_ticks = control.max_ticks(),
                "Tick limit reached"
            );
            return Ok(finish(
                control,
                SimulationEndReason::MaxTicksReached,
                total_ticks,
                Some(snapshot),
            )
            .await);
        }

        last_snapshot = Some(snapshot);

        tokio::select! {
            _ = interval.tick() => {}
            () = control.stopped() => {}
        }
    }
}

async fn finish(
    control: &RunControl,
    end_reason: SimulationEndReason,
    total_ticks: u64,
    final_snapshot: Option<EventStreamSnapshot>,
) -> RunResult {
    control.set_end_reason(end_reason).await;
    RunResult {
        end_reason,
        total_ticks,
        final_snapshot,
    }
}

/// Log how a run ended.
pub fn log_simulation_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_snapshot.as_ref().map(|s| s.tick),
        "Simulation ended"
    );

    if let Some(ref snapshot) = result.final_snapshot {
        info!(
            tick = snapshot.tick,
            live_events = snapshot.live_events.len(),
            totals = ?snapshot.totals,
            "Final snapshot"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, TimeDelta, Utc};
    use vitalmap_types::{Category, Region};

    use super::*;
    use crate::clock::ManualTimeSource;
    use crate::config::{SimulationBoundsConfig, StreamConfig};

    fn simulator() -> EventStreamSimulator {
        let config = StreamConfig {
            tick_interval_ms: 1_000,
            categories: [(Category::Death, 1.0)].into_iter().collect(),
            ..StreamConfig::default()
        };
        let regions = vec![Region::new("a", "Alpha", "", 30.0, 110.0, 1.0)];
        EventStreamSimulator::new(regions, &config, 5).unwrap()
    }

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn control(max_ticks: u64, max_real_time_seconds: u64) -> Arc<RunControl> {
        Arc::new(RunControl::new(&SimulationBoundsConfig {
            max_ticks,
            max_real_time_seconds,
        }))
    }

    struct Recorder {
        taken_at: Vec<DateTime<Utc>>,
    }

    impl TickCallback for Recorder {
        fn on_tick(&mut self, snapshot: &EventStreamSnapshot) {
            self.taken_at.push(snapshot.taken_at);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_by_max_ticks() {
        let mut sim = simulator();
        let control = control(5, 0);
        let clock = ManualTimeSource::new(start(), TimeDelta::seconds(1));

        let result = run_simulation(&mut sim, &control, &clock, &mut NoOpCallback)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(result.final_snapshot.unwrap().tick, 5);
        assert_eq!(
            control.end_reason().await,
            Some(SimulationEndReason::MaxTicksReached)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_start_runs_no_ticks() {
        let mut sim = simulator();
        let control = control(0, 0);
        control.request_stop();
        let clock = ManualTimeSource::new(start(), TimeDelta::seconds(1));

        let result = run_simulation(&mut sim, &control, &clock, &mut NoOpCallback)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 0);
        assert!(result.final_snapshot.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_the_wait_between_ticks() {
        let mut sim = simulator();
        let control = control(0, 0);
        let clock = ManualTimeSource::new(start(), TimeDelta::seconds(1));
        let mut recorder = Recorder {
            taken_at: Vec::new(),
        };

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(2_500)).await;
            control.request_stop();
        };
        let (result, ()) = tokio::join!(
            run_simulation(&mut sim, &control, &clock, &mut recorder),
            stopper
        );
        let result = result.unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 3);
        assert_eq!(result.final_snapshot.unwrap().tick, 3);
        assert_eq!(recorder.taken_at.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_by_real_time() {
        let mut sim = simulator();
        let control = control(0, 3);
        let clock = ManualTimeSource::new(start(), TimeDelta::seconds(1));

        let result = run_simulation(&mut sim, &control, &clock, &mut NoOpCallback)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::MaxRealTimeReached);
        assert_eq!(result.total_ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_sees_every_snapshot_in_order() {
        let mut sim = simulator();
        let control = control(4, 0);
        let clock = ManualTimeSource::new(start(), TimeDelta::milliseconds(800));
        let mut recorder = Recorder {
            taken_at: Vec::new(),
        };

        let _ = run_simulation(&mut sim, &control, &clock, &mut recorder)
            .await
            .unwrap();

        let expected: Vec<DateTime<Utc>> = (0..4)
            .map(|n| start() + TimeDelta::milliseconds(800 * n))
            .collect();
        assert_eq!(recorder.taken_at, expected);
    }
}
