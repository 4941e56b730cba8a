use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use vclock::{
    start_engine, start_engine_with, stop_engine, ClockConfig, ClockError, ClockState,
    HardwareClock, SharedClock, Updater, UpdaterExit, UpdaterStatus,
};

const START: i64 = 1_700_000_000;

fn clock(speed: i64, micros: i64) -> SharedClock {
    SharedClock::new(ClockState::with_time(
        START,
        micros,
        speed,
        false,
        NonZeroU32::new(300).unwrap(),
    ))
}

fn updater(clock: &SharedClock) -> Updater<StdRng> {
    Updater::new(clock.clone(), StdRng::seed_from_u64(42))
}

#[test]
fn real_time_speed_has_no_drift() {
    let clock = clock(100, 123_456);
    let mut updater = updater(&clock);
    for _ in 0..1000 {
        updater.step().expect("tick");
    }
    let snapshot = clock.snapshot();
    assert_eq!(snapshot.virtual_seconds, START + 1000);
    assert_eq!(snapshot.virtual_micros, 123_456);
}

#[test]
fn zero_speed_freezes_the_clock() {
    let clock = clock(0, 250_000);
    let mut updater = updater(&clock);
    for _ in 0..100 {
        updater.step().expect("tick");
    }
    let snapshot = clock.snapshot();
    assert_eq!(snapshot.virtual_seconds, START);
    assert_eq!(snapshot.virtual_micros, 250_000);
}

#[test]
fn slow_speed_accumulates_remainder() {
    let clock = clock(75, 0);
    let mut updater = updater(&clock);
    for _ in 0..4 {
        updater.step().expect("tick");
    }
    // 4 * 0.75s
    let snapshot = clock.snapshot();
    assert_eq!(snapshot.virtual_seconds, START + 3);
    assert_eq!(snapshot.virtual_micros, 0);
}

#[test]
fn random_mode_draws_within_bound() {
    let clock = clock(100, 0);
    clock.update(|state| state.set_random_mode(true));
    let mut updater = updater(&clock);

    const TICKS: i64 = 10_000;
    for _ in 0..TICKS {
        let tick = updater.step().expect("tick");
        assert!((0..300).contains(&tick.effective_speed));
    }

    let snapshot = clock.snapshot();
    let advanced_micros =
        (snapshot.virtual_seconds - START) * 1_000_000 + snapshot.virtual_micros;
    let seconds_per_tick = advanced_micros as f64 / TICKS as f64 / 1_000_000.0;
    // Uniform over [0, 300) averages 149.5
    assert!((seconds_per_tick - 1.495).abs() < 0.05, "{seconds_per_tick}");
    assert_eq!(snapshot.speed, 100);
}

#[test]
fn negative_speed_is_reported() {
    let clock = clock(100, 0);
    let mut updater = updater(&clock);
    updater.step().expect("tick");
    clock.update(|state| state.set_speed(-1));
    assert_eq!(updater.step(), Err(ClockError::InvalidSpeed(-1)));
    assert_eq!(clock.snapshot().virtual_seconds, START + 1);
}

#[tokio::test]
async fn engine_advances_and_stops_on_request() {
    let config = ClockConfig::default();
    let engine = start_engine_with(&config, StdRng::seed_from_u64(1), Duration::from_millis(20));
    let before = engine.clock().snapshot().virtual_seconds;
    assert_eq!(engine.status(), UpdaterStatus::Running);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let after = engine.clock().snapshot().virtual_seconds;
    // Each 20ms tick is worth one virtual second at speed 100
    assert!(after - before >= 2, "advanced {}", after - before);

    assert_eq!(stop_engine(engine).await, UpdaterExit::Requested);
}

#[tokio::test]
async fn stop_does_not_wait_for_a_full_tick() {
    let engine = start_engine(&ClockConfig::default());
    tokio::time::sleep(Duration::from_millis(10)).await;
    let started = Instant::now();
    let exit = tokio::time::timeout(Duration::from_millis(900), stop_engine(engine))
        .await
        .expect("stop within one tick");
    assert_eq!(exit, UpdaterExit::Requested);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn invalid_speed_stops_only_the_updater() {
    let config = ClockConfig::default();
    let mut engine =
        start_engine_with(&config, StdRng::seed_from_u64(1), Duration::from_millis(10));
    engine.clock().update(|state| state.set_speed(-1));

    let exit = tokio::time::timeout(Duration::from_secs(1), engine.stopped())
        .await
        .expect("updater should stop");
    assert_eq!(exit, UpdaterExit::Failed(ClockError::InvalidSpeed(-1)));
    assert_eq!(
        engine.status(),
        UpdaterStatus::Stopped(UpdaterExit::Failed(ClockError::InvalidSpeed(-1)))
    );

    // Control writes still work, but nothing ticks any more
    let control = engine.control();
    assert_eq!(control.write(b"s 100\n"), Ok(6));
    let frozen = engine.clock().snapshot();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.clock().snapshot(), frozen);
    assert_eq!(control.report().speed, 100);

    assert_eq!(
        stop_engine(engine).await,
        UpdaterExit::Failed(ClockError::InvalidSpeed(-1))
    );
}

#[tokio::test]
async fn engine_seeds_from_wall_clock() {
    let config = ClockConfig {
        speed: 0,
        ..ClockConfig::default()
    };
    let engine = start_engine(&config);
    let now = chrono::Utc::now().timestamp();
    let snapshot = engine.clock().snapshot();
    assert!((now - snapshot.virtual_seconds).abs() <= 1);
    assert_eq!(snapshot.engine_start_real_seconds, snapshot.virtual_seconds);
    assert_eq!(snapshot.speed, 0);
    assert!(engine.rtc().read_time().unwrap().year >= 2024);
    stop_engine(engine).await;
}
