//! The virtual clock engine.
//!
//! [`ClockState`] holds virtual time and the rate knobs behind one mutex
//! ([`SharedClock`]). The [`Updater`] advances it once per tick using the
//! fixed-point converter in [`rate`]; [`start_engine`] and [`stop_engine`]
//! manage the updater task.

pub mod config;
pub mod engine;
pub mod rate;
pub mod state;
pub mod updater;

pub use config::ClockConfig;
pub use engine::{start_engine, start_engine_with, stop_engine, EngineHandle};
pub use state::{ClockSnapshot, ClockState, SharedClock};
pub use updater::{Tick, Updater, UpdaterExit, UpdaterStatus, TICK};
