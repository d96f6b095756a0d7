//! The per-frame driver tying every subsystem together.
//!
//! [`Simulation::frame`] runs one frame in a fixed order:
//!
//! 1. advance the [`SimClock`] by `dt`
//! 2. update territories (queens, hives, liberation windows)
//! 3. tick the [`ThrottledScheduler`] (at most one low-frequency system)
//! 4. run any due recovery tasks
//!
//! Collaborators (energy pool, parasite population, defender spawner) are
//! injected at construction. Nothing in the frame path returns an error.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use hivefall_colony::{DefenseSpawner, EnergySystem, LiberationManager, ParasiteSource};
use hivefall_types::{ControlStatus, TerritoryId};
use hivefall_world::{Territory, TerritoryGrid};
use tracing::{debug, info};

use crate::clock::SimClock;
use crate::config::SimulationConfig;
use crate::recovery::ErrorRecoveryManager;
use crate::scheduler::{ThrottledScheduler, TickOutcome};
use crate::territory_manager::TerritoryManager;

/// Name of the energy housekeeping system.
pub const ENERGY_SYSTEM: &str = "energy";
/// Name of the parasite-count reconciliation system.
pub const TERRITORY_SYSTEM: &str = "territory";
/// Name of the liberation history upkeep system.
pub const LIBERATION_SYSTEM: &str = "liberation";
/// Name of the progression tracking system.
pub const PROGRESSION_SYSTEM: &str = "progression";

/// Coarse progress across the run, refreshed by the `progression` system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressionState {
    /// Highest queen generation seen in any territory.
    pub highest_generation: u32,
    /// Liberation windows recorded so far.
    pub liberations_observed: usize,
    /// Territories currently under queen control.
    pub controlled_territories: usize,
    /// Territories currently liberated.
    pub liberated_territories: usize,
}

impl ProgressionState {
    /// Recompute from the current territory state. The highest generation
    /// never decreases.
    pub fn refresh(&mut self, territories: &TerritoryManager) {
        let mut controlled = 0_usize;
        let mut liberated = 0_usize;
        for territory in territories.all_territories() {
            match territory.control_status() {
                ControlStatus::QueenControlled => controlled = controlled.saturating_add(1),
                ControlStatus::Liberated => liberated = liberated.saturating_add(1),
                ControlStatus::Contested => {}
            }
            if let Some(generation) = territories.generation_of(territory.id()) {
                self.highest_generation = self.highest_generation.max(generation);
            }
        }
        self.controlled_territories = controlled;
        self.liberated_territories = liberated;
        self.liberations_observed = territories
            .liberation()
            .map_or(0, |l| l.liberation_stats().total_liberations)
            .max(self.liberations_observed);
    }
}

/// Mutable state handed to every throttled system.
pub struct World {
    /// Territories, queens, hives and liberation windows.
    pub territories: TerritoryManager,
    /// Shared energy pool, also credited by liberation rewards.
    pub energy: Rc<RefCell<dyn EnergySystem>>,
    /// Run-level progression.
    pub progression: ProgressionState,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("territories", &self.territories)
            .field("progression", &self.progression)
            .finish_non_exhaustive()
    }
}

/// What one call to [`Simulation::frame`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Simulation time after the frame, in milliseconds.
    pub now_ms: u64,
    /// What the scheduler did this frame.
    pub scheduler: TickOutcome,
}

/// Owns the world, the scheduler and the recovery layer, and runs frames.
pub struct Simulation {
    clock: SimClock,
    frame: u64,
    world: World,
    scheduler: ThrottledScheduler<World>,
    recovery: ErrorRecoveryManager,
    parasites: Box<dyn ParasiteSource>,
    disposed: bool,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("clock", &self.clock)
            .field("frame", &self.frame)
            .field("world", &self.world)
            .field("scheduler", &self.scheduler)
            .field("recovery", &self.recovery)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Build a simulation from configuration.
    ///
    /// Creates every territory within `world.spawn_radius` cells of the
    /// origin, spawns a queen of `world.initial_generation` in each, and
    /// registers the four built-in throttled systems.
    pub fn new(
        config: &SimulationConfig,
        energy: Rc<RefCell<dyn EnergySystem>>,
        parasites: Box<dyn ParasiteSource>,
    ) -> Self {
        let grid = TerritoryGrid::new();
        let seed = config.world.seed;
        let liberation = LiberationManager::new(config.colony.liberation.clone(), seed)
            .with_energy(Box::new(Rc::clone(&energy)));
        let mut territories =
            TerritoryManager::new(grid, config.colony.clone(), seed.wrapping_add(1))
                .with_liberation(liberation)
                .with_frame_time_thresholds(config.performance.frame_time_thresholds_ms.clone());

        let radius = i32::try_from(config.world.spawn_radius).unwrap_or(i32::MAX);
        for x in radius.saturating_neg()..=radius {
            for z in radius.saturating_neg()..=radius {
                let center = grid.territory_center(TerritoryId::new(x, z));
                let id = territories.create_territory(center.x, center.z);
                territories.create_queen_for_territory(id, config.world.initial_generation);
            }
        }

        let mut scheduler = ThrottledScheduler::new();
        let intervals = &config.scheduler;
        scheduler.register(ENERGY_SYSTEM, intervals.energy_interval_ms, 0, update_energy);
        scheduler.register(
            TERRITORY_SYSTEM,
            intervals.territory_interval_ms,
            0,
            reconcile_territories,
        );
        scheduler.register(
            LIBERATION_SYSTEM,
            intervals.liberation_interval_ms,
            0,
            liberation_upkeep,
        );
        scheduler.register(
            PROGRESSION_SYSTEM,
            intervals.progression_interval_ms,
            0,
            refresh_progression,
        );

        let mut world = World {
            territories,
            energy,
            progression: ProgressionState::default(),
        };
        world.progression.refresh(&world.territories);

        info!(
            name = %config.world.name,
            seed,
            territories = world.territories.all_territories().count(),
            "Simulation initialised"
        );

        Self {
            clock: SimClock::new(),
            frame: 0,
            world,
            scheduler,
            recovery: ErrorRecoveryManager::new(config.recovery.clone()),
            parasites,
            disposed: false,
        }
    }

    /// Attach a spawner for hive defenders.
    #[must_use]
    pub fn with_defense_spawner(mut self, spawner: Box<dyn DefenseSpawner>) -> Self {
        self.world.territories.set_defense_spawner(spawner);
        self
    }

    /// Run one frame of `dt` seconds.
    pub fn frame(&mut self, dt: f32) -> FrameReport {
        if self.disposed {
            return FrameReport {
                frame: self.frame,
                now_ms: self.clock.now_ms(),
                scheduler: TickOutcome::Idle,
            };
        }
        self.frame = self.frame.saturating_add(1);
        let now_ms = self.clock.advance_secs(dt);
        self.world.territories.update(dt);
        let scheduler = self.scheduler.tick(&mut self.world, now_ms);
        self.recovery
            .advance(now_ms, &mut self.world.territories, self.parasites.as_ref());
        FrameReport {
            frame: self.frame,
            now_ms,
            scheduler,
        }
    }

    /// Forward an external frame-time measurement to the update throttle.
    /// Returns the new update interval.
    pub fn report_frame_time(&mut self, frame_ms: f32) -> u32 {
        self.world.territories.report_frame_time(frame_ms)
    }

    /// Frames run so far.
    pub const fn frames(&self) -> u64 {
        self.frame
    }

    /// Simulation time in milliseconds.
    pub const fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// The world state.
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world state.
    pub const fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The territory manager.
    pub const fn territories(&self) -> &TerritoryManager {
        &self.world.territories
    }

    /// Mutable territory manager.
    pub const fn territories_mut(&mut self) -> &mut TerritoryManager {
        &mut self.world.territories
    }

    /// The throttled scheduler, for registering additional systems.
    pub const fn scheduler_mut(&mut self) -> &mut ThrottledScheduler<World> {
        &mut self.scheduler
    }

    /// The recovery layer.
    pub const fn recovery(&self) -> &ErrorRecoveryManager {
        &self.recovery
    }

    /// Mutable recovery layer.
    pub const fn recovery_mut(&mut self) -> &mut ErrorRecoveryManager {
        &mut self.recovery
    }

    /// Run a recovery validation pass immediately.
    pub fn force_validation(&mut self) -> crate::recovery::ValidationReport {
        self.recovery
            .force_validation(&mut self.world.territories, self.parasites.as_ref())
    }

    /// Territories that currently have an active queen.
    pub fn controlled_territories(&self) -> BTreeSet<TerritoryId> {
        self.world
            .territories
            .all_territories()
            .filter(|t| t.control_status() == ControlStatus::QueenControlled)
            .map(Territory::id)
            .collect()
    }

    /// Tear everything down. Later frames do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.recovery.dispose();
        self.scheduler.clear();
        self.world.territories.dispose();
        info!(frames = self.frame, now_ms = self.clock.now_ms(), "Simulation disposed");
    }

    /// Whether [`Self::dispose`] has been called.
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }
}

// -----------------------------------------------------------------------
// Throttled systems
// -----------------------------------------------------------------------

fn update_energy(world: &mut World, dt: f32) {
    world.energy.borrow_mut().update(dt);
}

fn reconcile_territories(world: &mut World, _dt: f32) {
    let fixed = world.territories.reconcile_parasite_counts();
    if fixed > 0 {
        debug!(fixed, "Parasite counts reconciled");
    }
}

fn liberation_upkeep(world: &mut World, _dt: f32) {
    if let Some(liberation) = world.territories.liberation_mut() {
        let trimmed = liberation.trim_history();
        let stats = liberation.liberation_stats();
        debug!(
            trimmed,
            active = stats.active,
            total = stats.total_liberations,
            average_reward = stats.average_reward,
            "Liberation upkeep"
        );
    }
}

fn refresh_progression(world: &mut World, _dt: f32) {
    let before = world.progression.highest_generation;
    world.progression.refresh(&world.territories);
    if world.progression.highest_generation > before {
        info!(
            generation = world.progression.highest_generation,
            "New queen generation reached"
        );
    }
}
