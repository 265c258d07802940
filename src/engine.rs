//! Process-wide engine lifecycle.
//!
//! The world and the engine are exclusive capabilities: at most one of each
//! per process. Both live in module-level slots guarded by a mutex;
//! initializing an occupied slot fails with `AlreadyInitialized`, and test
//! hooks clear the slots between cases.
//!
//! The engine owns the scheduler and a driver thread that ticks it on a
//! self-correcting wall-clock interval: each delay is the configured
//! interval minus the previous tick's duration, floored at zero, so a slow
//! tick collapses the next delay instead of drifting the schedule.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::WorldConfig;
use crate::error::{EngineError, Result};
use crate::scheduler::{GameTime, Scheduler, SchedulerState};
use crate::world::World;

static WORLD: Mutex<Option<Arc<Mutex<World>>>> = Mutex::new(None);
static ENGINE: Mutex<Option<Engine>> = Mutex::new(None);

/// Read-only snapshot for the HTTP surface and CLI.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub step_number: u64,
    pub game_time: GameTime,
}

pub struct Engine {
    world: Arc<Mutex<World>>,
    scheduler: Arc<Mutex<Scheduler>>,
    running: Arc<AtomicBool>,
    driver: Option<JoinHandle<()>>,
}

impl Engine {
    /// Assemble an engine over an existing world: build the scheduler
    /// (fresh or restored) and register the built-in hydrology subsystem.
    pub fn new(world: Arc<Mutex<World>>, restore_from: Option<SchedulerState>) -> Result<Self> {
        let (scheduler_config, cadence, precipitation) = {
            let world = world.lock().expect("world lock");
            let cfg = world.config();
            (
                cfg.scheduler,
                cfg.hydrology_cadence_s,
                cfg.precipitation_m_per_day,
            )
        };

        let mut scheduler = match restore_from {
            Some(state) => Scheduler::restore(scheduler_config, state)?,
            None => Scheduler::new(scheduler_config)?,
        };

        // Rain depth per firing scales with the cadence.
        let rain_per_pass = (precipitation * cadence / 86_400.0) as f32;
        let hydro_world = Arc::clone(&world);
        scheduler.register_system("hydrology", cadence, move |ctx| {
            let mut world = hydro_world
                .lock()
                .map_err(|_| "world lock poisoned".to_string())?;
            let stats = world.run_hydrology_pass(rain_per_pass);
            debug!(
                step = ctx.step_number,
                chunks = stats.chunks_routed,
                flow = stats.total_flow_volume,
                "hydrology pass"
            );
            Ok(())
        })?;

        Ok(Self {
            world,
            scheduler: Arc::new(Mutex::new(scheduler)),
            running: Arc::new(AtomicBool::new(false)),
            driver: None,
        })
    }

    pub fn world(&self) -> Arc<Mutex<World>> {
        Arc::clone(&self.world)
    }

    pub fn scheduler(&self) -> Arc<Mutex<Scheduler>> {
        Arc::clone(&self.scheduler)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Begin ticking on the wall clock. The first tick lands one interval
    /// from now. No-op if already running.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let scheduler = Arc::clone(&self.scheduler);
        let running = Arc::clone(&self.running);
        let interval = scheduler.lock().expect("scheduler lock").real_interval();

        self.driver = Some(std::thread::spawn(move || {
            let mut delay = interval;
            loop {
                std::thread::sleep(delay);
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let started = Instant::now();
                scheduler.lock().expect("scheduler lock").tick();
                let elapsed = started.elapsed();
                delay = interval.saturating_sub(elapsed);
            }
        }));
        info!("engine started");
    }

    /// Stop ticking. A tick already in flight completes; only the next one
    /// is suppressed. No-op if not running.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(driver) = self.driver.take() {
            let _ = driver.join();
        }
        info!("engine stopped");
    }

    /// Drive N ticks synchronously, bypassing the wall clock. Headless runs
    /// and tests use this instead of `start`.
    pub fn tick_now(&self, ticks: u64) {
        let mut scheduler = self.scheduler.lock().expect("scheduler lock");
        for _ in 0..ticks {
            scheduler.tick();
        }
    }

    pub fn status(&self) -> EngineStatus {
        let scheduler = self.scheduler.lock().expect("scheduler lock");
        EngineStatus {
            running: self.is_running(),
            step_number: scheduler.step_number(),
            game_time: scheduler.game_time(),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Initialize the process world slot. Fails if a world already exists.
pub fn init_world(config: WorldConfig, seed: u32) -> Result<Arc<Mutex<World>>> {
    let mut slot = WORLD.lock().expect("world slot lock");
    if slot.is_some() {
        return Err(EngineError::AlreadyInitialized("world"));
    }
    let world = Arc::new(Mutex::new(World::generate(config, seed)?));
    *slot = Some(Arc::clone(&world));
    Ok(world)
}

/// The live world, if any.
pub fn world() -> Result<Arc<Mutex<World>>> {
    WORLD
        .lock()
        .expect("world slot lock")
        .as_ref()
        .map(Arc::clone)
        .ok_or(EngineError::NotInitialized("world"))
}

/// Start the process engine over the live world. Fails if one is running.
pub fn start_engine(restore_from: Option<SchedulerState>) -> Result<()> {
    let world = world()?;
    let mut slot = ENGINE.lock().expect("engine slot lock");
    if slot.is_some() {
        return Err(EngineError::AlreadyInitialized("engine"));
    }
    let mut engine = Engine::new(world, restore_from)?;
    engine.start();
    *slot = Some(engine);
    Ok(())
}

/// Stop and clear the process engine. A later `start_engine` over a
/// reconfigured world is a restart.
pub fn stop_engine() -> Result<()> {
    let mut slot = ENGINE.lock().expect("engine slot lock");
    match slot.take() {
        Some(mut engine) => {
            engine.stop();
            Ok(())
        }
        None => Err(EngineError::NotInitialized("engine")),
    }
}

/// Status of the process engine.
pub fn engine_status() -> Result<EngineStatus> {
    let slot = ENGINE.lock().expect("engine slot lock");
    slot.as_ref()
        .map(Engine::status)
        .ok_or(EngineError::NotInitialized("engine"))
}

/// Scheduler snapshot of the process engine.
pub fn engine_scheduler_state() -> Result<SchedulerState> {
    let slot = ENGINE.lock().expect("engine slot lock");
    let engine = slot.as_ref().ok_or(EngineError::NotInitialized("engine"))?;
    let scheduler = engine.scheduler();
    let state = scheduler.lock().expect("scheduler lock").state();
    Ok(state)
}

/// Serializes tests that touch the process-wide slots.
#[cfg(test)]
pub(crate) static TEST_GUARD: Mutex<()> = Mutex::new(());

/// Test hook: clear both slots regardless of state.
pub fn reset_for_tests() {
    let mut engine = ENGINE.lock().expect("engine slot lock");
    if let Some(mut e) = engine.take() {
        e.stop();
    }
    drop(engine);
    *WORLD.lock().expect("world slot lock") = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::params::Span;
    use crate::terrain::TerrainParams;

    fn small_config() -> WorldConfig {
        WorldConfig {
            world_width_m: 128_000.0,
            world_height_m: 64_000.0,
            cell_size_m: 1000.0,
            chunk_cells: 16,
            max_resident_chunks: 8,
            terrain: TerrainParams {
                major_radius_km: 20.0,
                minor_radius_km: 8.0,
                main_belt_length_km: Span::new(20.0, 40.0),
                main_belt_width_km: Span::new(4.0, 8.0),
                secondary_belt_length_km: Span::new(10.0, 22.0),
                secondary_belt_width_km: Span::new(2.0, 5.0),
                coarse_sample_res: 24,
                ..TerrainParams::default()
            },
            ..WorldConfig::default()
        }
    }

    #[test]
    fn test_world_singleton_gating() {
        let _guard = TEST_GUARD.lock().unwrap();
        reset_for_tests();

        assert!(matches!(world(), Err(EngineError::NotInitialized(_))));
        init_world(small_config(), 1).unwrap();
        assert!(world().is_ok());
        assert!(matches!(
            init_world(small_config(), 2),
            Err(EngineError::AlreadyInitialized(_))
        ));

        reset_for_tests();
        assert!(matches!(world(), Err(EngineError::NotInitialized(_))));
    }

    #[test]
    fn test_engine_singleton_gating() {
        let _guard = TEST_GUARD.lock().unwrap();
        reset_for_tests();

        assert!(matches!(
            start_engine(None),
            Err(EngineError::NotInitialized(_))
        ));
        init_world(small_config(), 1).unwrap();
        start_engine(None).unwrap();
        assert!(matches!(
            start_engine(None),
            Err(EngineError::AlreadyInitialized(_))
        ));
        assert!(engine_status().unwrap().running);

        stop_engine().unwrap();
        assert!(matches!(stop_engine(), Err(EngineError::NotInitialized(_))));
        // Restart over the same world is allowed after stop.
        start_engine(None).unwrap();
        stop_engine().unwrap();

        reset_for_tests();
    }

    #[test]
    fn test_tick_now_and_hydrology_system() {
        let _guard = TEST_GUARD.lock().unwrap();
        reset_for_tests();

        let world = init_world(small_config(), 5).unwrap();
        world.lock().unwrap().cache().get_chunk(0, 0);

        let engine = Engine::new(Arc::clone(&world), None).unwrap();
        // Default cadence 3600 s at 60 s/tick: fires every 60 ticks.
        engine.tick_now(60);
        let status = engine.status();
        assert_eq!(status.step_number, 60);
        assert_eq!(status.game_time.total_minutes, 60);
        assert!(!status.running);
        // The pass ran: cache accesses grew beyond our single get.
        let accesses = world.lock().unwrap().cache_stats().total_accesses;
        assert!(accesses > 1, "hydrology system never touched the cache");

        reset_for_tests();
    }

    #[test]
    fn test_engine_restore_rebinds_hydrology() {
        let _guard = TEST_GUARD.lock().unwrap();
        reset_for_tests();

        let world = init_world(small_config(), 6).unwrap();
        let engine = Engine::new(Arc::clone(&world), None).unwrap();
        engine.tick_now(30);
        let state = engine.scheduler().lock().unwrap().state();
        drop(engine);

        let restored = Engine::new(world, Some(state)).unwrap();
        let status = restored.status();
        assert_eq!(status.step_number, 30);
        // The accumulator survived: 30 ticks in, the hydrology system is
        // halfway to its 3600 s cadence.
        let acc = restored.scheduler().lock().unwrap().state();
        let acc = acc.accumulators.get("hydrology").unwrap().accumulated;
        assert!((acc - 1800.0).abs() < 1e-9);

        reset_for_tests();
    }

    #[test]
    fn test_wall_clock_driver_ticks() {
        let _guard = TEST_GUARD.lock().unwrap();
        reset_for_tests();

        let mut cfg = small_config();
        cfg.scheduler.real_interval_s = 1.0;
        let world = init_world(cfg, 8).unwrap();
        let mut engine = Engine::new(world, None).unwrap();
        engine.start();
        engine.start(); // no-op
        std::thread::sleep(std::time::Duration::from_millis(2500));
        engine.stop();
        engine.stop(); // no-op
        let steps = engine.status().step_number;
        assert!(
            (1..=3).contains(&steps),
            "expected ~2 ticks after 2.5 s at 1 s interval, got {steps}"
        );

        reset_for_tests();
    }
}
