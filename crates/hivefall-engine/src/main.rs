//! Headless engine binary for Hivefall.
//!
//! Wires the territorial core to in-memory demo collaborators and runs
//! the frame loop until `simulation.max_frames` is reached (or Ctrl-C in
//! real-time mode).
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `hivefall-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the energy pool and parasite swarm
//! 4. Build the simulation (territories, queens, scheduler, recovery)
//! 5. Run frames, raiding and recruiting along the way
//! 6. Log the result and dispose

mod demo;
mod error;
mod observer;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use hivefall_colony::EnergySystem;
use hivefall_core::config::SimulationConfig;
use hivefall_core::simulation::Simulation;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::demo::{DemoConfig, EnergyPool, ParasiteSwarm, Raider};
use crate::error::EngineError;
use crate::observer::{EventCounts, EventLog};

const CONFIG_PATH: &str = "hivefall-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;
    let demo_config = load_demo_config()?;

    // 2. Initialize structured logging.
    let fallback = config.logging.level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(true)
        .init();

    info!("hivefall-engine starting");
    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        frame_rate = config.world.frame_rate,
        spawn_radius = config.world.spawn_radius,
        max_frames = config.simulation.max_frames,
        real_time = config.simulation.real_time,
        "Configuration loaded"
    );

    // 3. Collaborators.
    let pool = Rc::new(RefCell::new(EnergyPool::new(demo_config.initial_energy)));
    let swarm = Rc::new(RefCell::new(ParasiteSwarm::new(
        &demo_config,
        config.world.seed.wrapping_add(7),
    )));
    let energy: Rc<RefCell<dyn EnergySystem>> = pool.clone();

    // 4. Simulation.
    let mut sim = Simulation::new(&config, energy, Box::new(Rc::clone(&swarm)))
        .with_defense_spawner(Box::new(Rc::clone(&swarm)));
    let counts = Rc::new(RefCell::new(EventCounts::default()));
    sim.territories_mut()
        .subscribe(Box::new(EventLog::new(Rc::clone(&counts))));
    let startup_events = sim.territories_mut().drain_events().len();
    debug!(startup_events, "Startup events drained");

    let mut raider = Raider::new(&demo_config, config.world.seed.wrapping_add(13));

    // 5. Frame loop.
    let frame_rate = config.world.frame_rate.clamp(1, 1000);
    #[allow(clippy::cast_precision_loss)]
    let dt = 1.0 / frame_rate as f32;
    let mut ticker = tokio::time::interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(frame_rate, "Entering frame loop");
    let started = Instant::now();
    while sim.frames() < config.simulation.max_frames {
        if config.simulation.real_time {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        let frame_start = Instant::now();
        let report = sim.frame(dt);
        swarm.borrow_mut().step(dt);
        raider.maybe_raid(report.frame, sim.territories_mut());
        if report.frame.checked_rem(60) == Some(0) {
            let recruited = demo::recruit_defenders(sim.territories_mut(), &swarm.borrow());
            if recruited > 0 {
                debug!(recruited, "Defenders recruited");
            }
        }
        sim.territories_mut().drain_events();

        let frame_ms = frame_start.elapsed().as_secs_f32() * 1000.0;
        sim.report_frame_time(frame_ms);

        if report.frame.checked_rem(demo_config.status_interval_frames) == Some(0) {
            log_status(&sim, &pool.borrow(), &swarm.borrow());
        }
    }

    // 6. Results.
    log_status(&sim, &pool.borrow(), &swarm.borrow());
    let totals = *counts.borrow();
    let recovery = sim.recovery().stats();
    info!(
        frames = sim.frames(),
        sim_time_ms = sim.now_ms(),
        wall_time_ms = started.elapsed().as_millis(),
        queens_spawned = totals.queens_spawned,
        queens_destroyed = totals.queens_destroyed,
        hives_constructed = totals.hives_constructed,
        hives_destroyed = totals.hives_destroyed,
        liberations = totals.liberations,
        energy_credited = pool.borrow().credited(),
        validations = recovery.validations_run,
        errors_detected = recovery.errors_detected,
        corrections_succeeded = recovery.corrections_succeeded,
        corrections_abandoned = recovery.corrections_abandoned,
        "Run complete"
    );
    sim.dispose();

    info!("hivefall-engine shutdown complete");
    Ok(())
}

/// Log a one-line summary of the world.
fn log_status(sim: &Simulation, pool: &EnergyPool, swarm: &ParasiteSwarm) {
    let progression = &sim.world().progression;
    let errors = sim.recovery().current_errors();
    info!(
        frame = sim.frames(),
        territories = sim.territories().all_territories().count(),
        controlled = progression.controlled_territories,
        liberated = progression.liberated_territories,
        highest_generation = progression.highest_generation,
        queens = sim.territories().all_queens().count(),
        hives = sim.territories().all_hives().count(),
        parasites = swarm.alive(),
        energy = pool.total_energy(),
        update_interval = sim.territories().update_interval(),
        pending_errors = errors.total(),
        "Status"
    );
}

/// Load the main simulation configuration from `hivefall-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(SimulationConfig::from_file(config_path)?)
    } else {
        Ok(SimulationConfig::default())
    }
}

/// Load demo collaborator settings from the `demo` section of
/// `hivefall-config.yaml`. A missing file or section gives the defaults.
fn load_demo_config() -> Result<DemoConfig, EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if !config_path.exists() {
        return Ok(DemoConfig::default());
    }
    let contents = std::fs::read_to_string(config_path).map_err(|e| EngineError::Demo {
        message: format!("failed to read config file: {e}"),
    })?;
    let raw: serde_yml::Value = serde_yml::from_str(&contents).map_err(|e| EngineError::Demo {
        message: format!("failed to parse config YAML: {e}"),
    })?;
    match raw.get("demo") {
        Some(section) => serde_yml::from_value(section.clone()).map_err(|e| EngineError::Demo {
            message: format!("failed to parse demo config: {e}"),
        }),
        None => Ok(DemoConfig::default()),
    }
}
