//! The mutable clock record and the lock-guarded handle shared by the
//! updater, the control interface and the RTC adapter.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::rate::SCALE;
use crate::error::ClockError;

/// Earliest virtual second that still has a calendar date.
pub fn min_virtual_seconds() -> i64 {
    DateTime::<Utc>::MIN_UTC.timestamp()
}

/// Latest virtual second that still has a calendar date. Ticking stops
/// advancing the seconds here.
pub fn max_virtual_seconds() -> i64 {
    DateTime::<Utc>::MAX_UTC.timestamp()
}

/// Virtual time plus the knobs that drive its advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockState {
    /// Whole seconds of simulated time
    virtual_seconds: i64,
    /// Fractional remainder in μs, kept in [0, SCALE)
    virtual_micros: i64,
    /// 100 = real time, 0 = frozen
    speed: i64,
    random_mode: bool,
    /// Exclusive upper bound of the per-tick random speed
    random_bound: NonZeroU32,
    /// Real Unix seconds at engine start
    engine_start_real_seconds: i64,
}

/// A copy of [`ClockState`] taken under the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub virtual_seconds: i64,
    pub virtual_micros: i64,
    pub speed: i64,
    pub random_mode: bool,
    pub random_bound: u32,
    pub engine_start_real_seconds: i64,
}

impl ClockState {
    /// Creates a state seeded from the real wall clock.
    pub fn from_wall_clock(speed: i64, random_mode: bool, random_bound: NonZeroU32) -> Self {
        let now = Utc::now();
        Self::with_time(
            now.timestamp(),
            now.timestamp_subsec_micros() as i64,
            speed,
            random_mode,
            random_bound,
        )
    }

    /// Creates a state at an explicit virtual time, which doubles as the
    /// recorded start time. Mostly useful for tests.
    pub fn with_time(
        seconds: i64,
        micros: i64,
        speed: i64,
        random_mode: bool,
        random_bound: NonZeroU32,
    ) -> Self {
        assert!((0..SCALE).contains(&micros), "micros must be in [0, 1_000_000)");
        assert!(
            (min_virtual_seconds()..=max_virtual_seconds()).contains(&seconds),
            "seconds must have a calendar date"
        );
        Self {
            virtual_seconds: seconds,
            virtual_micros: micros,
            speed,
            random_mode,
            random_bound,
            engine_start_real_seconds: seconds,
        }
    }

    pub fn virtual_seconds(&self) -> i64 {
        self.virtual_seconds
    }

    pub fn virtual_micros(&self) -> i64 {
        self.virtual_micros
    }

    pub fn speed(&self) -> i64 {
        self.speed
    }

    pub fn random_mode(&self) -> bool {
        self.random_mode
    }

    pub fn random_bound(&self) -> NonZeroU32 {
        self.random_bound
    }

    pub fn engine_start_real_seconds(&self) -> i64 {
        self.engine_start_real_seconds
    }

    /// Sets the speed without validation. A negative value stops the updater
    /// on its next tick.
    pub fn set_speed(&mut self, speed: i64) {
        self.speed = speed;
    }

    pub fn set_random_mode(&mut self, enabled: bool) {
        self.random_mode = enabled;
    }

    pub fn set_random_bound(&mut self, bound: NonZeroU32) {
        self.random_bound = bound;
    }

    /// Sets the seconds. Values without a calendar date are rejected.
    pub fn set_virtual_seconds(&mut self, seconds: i64) -> Result<(), ClockError> {
        if !(min_virtual_seconds()..=max_virtual_seconds()).contains(&seconds) {
            return Err(ClockError::SecondsOutOfRange(seconds));
        }
        self.virtual_seconds = seconds;
        Ok(())
    }

    /// Sets the micros remainder. Values outside `[0, 1_000_000)` are rejected
    /// rather than carried into the seconds field.
    pub fn set_virtual_micros(&mut self, micros: i64) -> Result<(), ClockError> {
        if !(0..SCALE).contains(&micros) {
            return Err(ClockError::MicrosOutOfRange(micros));
        }
        self.virtual_micros = micros;
        Ok(())
    }

    /// Applies one converted increment: adds whole seconds and replaces the
    /// micros remainder in a single step. Seconds stop at
    /// [`max_virtual_seconds`].
    pub(crate) fn commit(&mut self, seconds: i64, micros: i64) {
        debug_assert!((0..SCALE).contains(&micros));
        self.virtual_seconds = self
            .virtual_seconds
            .saturating_add(seconds)
            .min(max_virtual_seconds());
        self.virtual_micros = micros;
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            virtual_seconds: self.virtual_seconds,
            virtual_micros: self.virtual_micros,
            speed: self.speed,
            random_mode: self.random_mode,
            random_bound: self.random_bound.get(),
            engine_start_real_seconds: self.engine_start_real_seconds,
        }
    }
}

/// Cloneable handle to the one [`ClockState`] of an engine.
///
/// Every access goes through a single mutex, held only for the duration of
/// the closure passed to [`read`](Self::read) or [`update`](Self::update).
#[derive(Debug, Clone)]
pub struct SharedClock {
    inner: Arc<Mutex<ClockState>>,
}

impl SharedClock {
    pub fn new(state: ClockState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub fn read<T>(&self, f: impl FnOnce(&ClockState) -> T) -> T {
        f(&self.lock())
    }

    pub fn update<T>(&self, f: impl FnOnce(&mut ClockState) -> T) -> T {
        f(&mut self.lock())
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        self.read(ClockState::snapshot)
    }

    // Every write leaves the record consistent, so a panic in another holder
    // does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
