//! A virtual real-time clock whose rate of advance is configurable.
//!
//! The [`clock`] module holds the engine: shared state, the fixed-point rate
//! converter and the periodic updater. [`control`] implements the text
//! control channel and [`rtc`] the hardware-clock view of the same state.

pub mod clock;
pub mod control;
pub mod error;
pub mod rtc;

pub use clock::{
    start_engine, start_engine_with, stop_engine, ClockConfig, ClockSnapshot, ClockState,
    EngineHandle, SharedClock, Tick, Updater, UpdaterExit, UpdaterStatus,
};
pub use control::{ControlInterface, Report};
pub use error::ClockError;
pub use rtc::{CalendarTime, HardwareClock, VirtualRtc};
