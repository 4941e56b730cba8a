//! Engine lifecycle: seeds the clock state and supervises the updater task.

use std::time::Duration;

use log::*;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::config::ClockConfig;
use super::state::{ClockState, SharedClock};
use super::updater::{Updater, UpdaterExit, UpdaterStatus, TICK};
use crate::control::ControlInterface;
use crate::rtc::VirtualRtc;

/// A running engine. Dropping it also stops the updater, but without a way
/// to learn how it exited.
pub struct EngineHandle {
    clock: SharedClock,
    stop: oneshot::Sender<()>,
    task: JoinHandle<UpdaterExit>,
    status: watch::Receiver<UpdaterStatus>,
}

/// Starts an engine with the default one-second tick and an entropy-seeded
/// random source. Must be called from within a tokio runtime.
pub fn start_engine(config: &ClockConfig) -> EngineHandle {
    start_engine_with(config, StdRng::from_entropy(), TICK)
}

/// Starts an engine with an explicit random source and tick period.
pub fn start_engine_with<R>(config: &ClockConfig, rng: R, period: Duration) -> EngineHandle
where
    R: RngCore + Send + 'static,
{
    let state = ClockState::from_wall_clock(config.speed, config.random_mode, config.random_bound);
    info!(
        "Starting engine at {}s: speed {}, random {}, random bound {}",
        state.virtual_seconds(),
        config.speed,
        config.random_mode,
        config.random_bound
    );
    let clock = SharedClock::new(state);
    let (stop_tx, stop_rx) = oneshot::channel();
    let (status_tx, status_rx) = watch::channel(UpdaterStatus::Running);
    let updater = Updater::with_period(clock.clone(), rng, period);
    let task = tokio::spawn(updater.run(stop_rx, status_tx));

    EngineHandle {
        clock,
        stop: stop_tx,
        task,
        status: status_rx,
    }
}

/// Requests the updater to stop and waits for it. If the updater had
/// already failed, that failure is returned instead, and a task that
/// panicked yields [`UpdaterExit::Aborted`].
pub async fn stop_engine(handle: EngineHandle) -> UpdaterExit {
    // Err means the updater already exited on its own
    let _ = handle.stop.send(());
    let exit = match handle.task.await {
        Ok(exit) => exit,
        Err(err) => {
            error!("Updater task failed: {err}");
            UpdaterExit::Aborted
        }
    };
    info!("Engine stopped: {exit:?}");
    exit
}

impl EngineHandle {
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn control(&self) -> ControlInterface {
        ControlInterface::new(self.clock.clone())
    }

    pub fn rtc(&self) -> VirtualRtc {
        VirtualRtc::new(self.clock.clone())
    }

    pub fn status(&self) -> UpdaterStatus {
        self.status.borrow().clone()
    }

    /// Resolves once the updater has stopped, for whatever reason.
    pub async fn stopped(&mut self) -> UpdaterExit {
        loop {
            if let UpdaterStatus::Stopped(exit) = &*self.status.borrow_and_update() {
                return exit.clone();
            }
            if self.status.changed().await.is_err() {
                // Sender dropped without a final status
                return UpdaterExit::Aborted;
            }
        }
    }
}
