//! Event-stream simulator, tick clock, and driver loop for Vitalmap.
//!
//! This crate owns the simulation core: a weighted region table, a
//! per-tick Bernoulli event generator with sliding-window expiry, running
//! totals and bounded logs, plus the async loop that paces it.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `vitalmap-config.yaml` into
//!   strongly-typed structs.
//! - [`regions`] -- Validated region table, weighted sampling, and the
//!   built-in provincial table.
//! - [`clock`] -- Tick counter with sweep scheduling and the
//!   [`TimeSource`] abstraction.
//! - [`totals`] -- Monotonic per-category and per-region counters.
//! - [`recent_log`] -- Bounded most-recent-first log.
//! - [`simulator`] -- [`EventStreamSimulator`] itself.
//! - [`control`] -- [`RunControl`] shared with the operator API.
//! - [`runner`] -- [`run_simulation`] driver loop and [`TickCallback`].
//!
//! [`TimeSource`]: clock::TimeSource
//! [`EventStreamSimulator`]: simulator::EventStreamSimulator
//! [`RunControl`]: control::RunControl
//! [`run_simulation`]: runner::run_simulation
//! [`TickCallback`]: runner::TickCallback

pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod recent_log;
pub mod regions;
pub mod runner;
pub mod simulator;
pub mod totals;

pub use error::SimulatorError;
