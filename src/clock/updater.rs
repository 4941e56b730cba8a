//! Periodic task that advances virtual time once per real-time tick.

use std::time::Duration;

use log::*;
use rand::RngCore;
use tokio::sync::{oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};

use super::rate;
use super::state::SharedClock;
use crate::error::ClockError;

/// One real second, the period at which speed 100 matches real time.
pub const TICK: Duration = Duration::from_secs(1);

/// Outcome of a single committed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Speed used for this tick: the persisted speed, or the random draw.
    pub effective_speed: i64,
    pub virtual_seconds: i64,
    pub virtual_micros: i64,
}

/// Why the updater loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdaterExit {
    Requested,
    Failed(ClockError),
    /// The task ended without reporting, e.g. it panicked.
    Aborted,
}

/// Lifecycle of the updater as seen by its supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdaterStatus {
    Running,
    Stopped(UpdaterExit),
}

pub struct Updater<R> {
    clock: SharedClock,
    rng: R,
    period: Duration,
}

impl<R: RngCore> Updater<R> {
    pub fn new(clock: SharedClock, rng: R) -> Self {
        Self::with_period(clock, rng, TICK)
    }

    /// Creates an updater with a custom tick period. Speed stays relative to
    /// the tick, so with a shorter period the clock no longer tracks real
    /// time at speed 100.
    pub fn with_period(clock: SharedClock, rng: R, period: Duration) -> Self {
        Self { clock, rng, period }
    }

    /// Advances the clock by one tick without sleeping.
    ///
    /// The whole read-compute-commit sequence happens under one lock, so a
    /// concurrent reader sees either the old or the new (seconds, micros) pair.
    pub fn step(&mut self) -> Result<Tick, ClockError> {
        let rng = &mut self.rng;
        self.clock.update(|state| {
            let speed = state.speed();
            if speed < 0 {
                return Err(ClockError::InvalidSpeed(speed));
            }
            let effective_speed = if state.random_mode() {
                (rng.next_u32() % state.random_bound().get()) as i64
            } else {
                speed
            };
            let advance = rate::convert(effective_speed, state.virtual_micros());
            state.commit(advance.seconds, advance.micros);
            Ok(Tick {
                effective_speed,
                virtual_seconds: state.virtual_seconds(),
                virtual_micros: state.virtual_micros(),
            })
        })
    }

    /// Runs until `stop` fires or a tick fails. The stop request is observed
    /// within one period. Every status change is published on `status`.
    pub async fn run(
        mut self,
        mut stop: oneshot::Receiver<()>,
        status: watch::Sender<UpdaterStatus>,
    ) -> UpdaterExit {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;
        info!("Updater started, tick period {:?}", self.period);

        let exit = loop {
            tokio::select! {
                biased;
                _ = &mut stop => break UpdaterExit::Requested,
                _ = ticker.tick() => match self.step() {
                    Ok(tick) => debug!("{tick:?}"),
                    // Every step error is fatal
                    Err(err) => {
                        error!("{err}. Updater stopped.");
                        break UpdaterExit::Failed(err);
                    }
                },
            }
        };

        if exit == UpdaterExit::Requested {
            info!("Updater stopped by request");
        }
        let _ = status.send(UpdaterStatus::Stopped(exit.clone()));
        exit
    }
}
