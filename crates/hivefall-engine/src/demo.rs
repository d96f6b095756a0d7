//! Stand-in collaborators for headless runs.
//!
//! The territorial core only talks to energy, parasites and defender
//! spawning through traits. This module provides small in-memory versions
//! so the engine can run the full loop without a renderer or a combat
//! system attached, plus a raid driver that damages queens and hives so
//! liberation and respawn get exercised.

use std::collections::BTreeMap;

use hivefall_colony::{DefenseSpawner, EnergySystem, ParasiteSource, ParasiteView};
use hivefall_core::territory_manager::TerritoryManager;
use hivefall_types::{HiveId, ParasiteId, Position, QueenPhase};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, info};

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Demo collaborator settings, loaded from the `demo` section of
/// `hivefall-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DemoConfig {
    /// Energy in the pool at startup.
    #[serde(default = "default_initial_energy")]
    pub initial_energy: f32,

    /// Frames between raids on active queens and hives. 0 disables raids.
    #[serde(default = "default_raid_interval_frames")]
    pub raid_interval_frames: u64,

    /// Damage dealt per raid.
    #[serde(default = "default_raid_damage")]
    pub raid_damage: f32,

    /// Maximum distance a parasite drifts per second.
    #[serde(default = "default_wander_speed")]
    pub wander_speed: f32,

    /// Chance per second that a live parasite dies.
    #[serde(default = "default_attrition_per_sec")]
    pub attrition_per_sec: f32,

    /// Frames between status log lines.
    #[serde(default = "default_status_interval_frames")]
    pub status_interval_frames: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            initial_energy: default_initial_energy(),
            raid_interval_frames: default_raid_interval_frames(),
            raid_damage: default_raid_damage(),
            wander_speed: default_wander_speed(),
            attrition_per_sec: default_attrition_per_sec(),
            status_interval_frames: default_status_interval_frames(),
        }
    }
}

const fn default_initial_energy() -> f32 {
    100.0
}

const fn default_raid_interval_frames() -> u64 {
    1800
}

const fn default_raid_damage() -> f32 {
    35.0
}

const fn default_wander_speed() -> f32 {
    4.0
}

const fn default_attrition_per_sec() -> f32 {
    0.002
}

const fn default_status_interval_frames() -> u64 {
    600
}

// -----------------------------------------------------------------------
// Energy
// -----------------------------------------------------------------------

/// A single shared energy balance.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyPool {
    total: f32,
    credited: f32,
}

impl EnergyPool {
    /// A pool holding `initial` energy.
    pub const fn new(initial: f32) -> Self {
        Self {
            total: initial,
            credited: 0.0,
        }
    }

    /// Energy credited since startup.
    pub const fn credited(&self) -> f32 {
        self.credited
    }
}

impl EnergySystem for EnergyPool {
    fn credit_energy(&mut self, amount: f32) {
        if amount.is_finite() && amount > 0.0 {
            self.total += amount;
            self.credited += amount;
        }
    }

    fn consume_energy(&mut self, amount: f32) -> bool {
        if !amount.is_finite() || amount < 0.0 || amount > self.total {
            return false;
        }
        self.total -= amount;
        true
    }

    fn total_energy(&self) -> f32 {
        self.total
    }
}

// -----------------------------------------------------------------------
// Parasites
// -----------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Parasite {
    position: Position,
    alive: bool,
}

/// An in-memory parasite population that wanders and slowly dies off.
///
/// Doubles as the defender spawner: defenders are added to the population
/// around their hive.
#[derive(Debug)]
pub struct ParasiteSwarm {
    parasites: BTreeMap<ParasiteId, Parasite>,
    wander_speed: f32,
    attrition_per_sec: f32,
    rng: SmallRng,
}

impl ParasiteSwarm {
    /// An empty swarm.
    pub fn new(config: &DemoConfig, seed: u64) -> Self {
        Self {
            parasites: BTreeMap::new(),
            wander_speed: if config.wander_speed.is_finite() {
                config.wander_speed.max(0.0)
            } else {
                0.0
            },
            attrition_per_sec: if config.attrition_per_sec.is_finite() {
                config.attrition_per_sec.clamp(0.0, 1.0)
            } else {
                0.0
            },
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Move every live parasite and roll attrition for `dt` seconds.
    /// Dead parasites are dropped from the population.
    pub fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let reach = self.wander_speed * dt;
        let death_chance = f64::from((self.attrition_per_sec * dt).clamp(0.0, 1.0));
        for parasite in self.parasites.values_mut().filter(|p| p.alive) {
            if reach > 0.0 {
                parasite.position.x += self.rng.random_range(-reach..=reach);
                parasite.position.z += self.rng.random_range(-reach..=reach);
            }
            if self.rng.random_bool(death_chance) {
                parasite.alive = false;
            }
        }
        self.parasites.retain(|_, p| p.alive);
    }

    /// Number of live parasites.
    pub fn alive(&self) -> usize {
        self.parasites.values().filter(|p| p.alive).count()
    }

    /// Whether `id` is a live member of the swarm.
    pub fn is_alive(&self, id: ParasiteId) -> bool {
        self.parasites.get(&id).is_some_and(|p| p.alive)
    }
}

/// Hand each active queen the live defenders of her own hive, up to her
/// control limit. Returns how many parasites were newly assigned.
pub fn recruit_defenders(territories: &mut TerritoryManager, swarm: &ParasiteSwarm) -> usize {
    let hive_ids: Vec<HiveId> = territories.all_hives().map(|h| h.id().clone()).collect();
    let mut assigned = 0_usize;
    for hive_id in hive_ids {
        let Some(hive) = territories.hive_mut(&hive_id) else {
            continue;
        };
        let queen_id = hive.queen_id();
        let defenders = hive.live_defenders(|id| swarm.is_alive(id)).to_vec();
        for parasite in defenders {
            let held = territories.queen(queen_id).is_some_and(|q| q.controls(parasite));
            if !held && territories.assign_parasite(queen_id, parasite) {
                assigned = assigned.saturating_add(1);
            }
        }
    }
    assigned
}

impl ParasiteSource for ParasiteSwarm {
    fn all_parasites(&self) -> Vec<ParasiteView> {
        self.parasites
            .iter()
            .map(|(id, p)| ParasiteView {
                id: *id,
                alive: p.alive,
                position: p.position,
            })
            .collect()
    }
}

impl DefenseSpawner for ParasiteSwarm {
    fn spawn_defenders(
        &mut self,
        hive: &HiveId,
        position: Position,
        count: u32,
    ) -> Vec<ParasiteId> {
        let spread = 24.0_f32;
        let ids: Vec<ParasiteId> = (0..count)
            .map(|_| {
                let id = ParasiteId::new();
                let offset_x = self.rng.random_range(-spread..=spread);
                let offset_z = self.rng.random_range(-spread..=spread);
                self.parasites.insert(
                    id,
                    Parasite {
                        position: Position::ground(position.x + offset_x, position.z + offset_z),
                        alive: true,
                    },
                );
                id
            })
            .collect();
        debug!(hive_id = %hive, count = ids.len(), "Defenders spawned");
        ids
    }
}

// -----------------------------------------------------------------------
// Raids
// -----------------------------------------------------------------------

/// Periodically damages one active queen or hive.
#[derive(Debug)]
pub struct Raider {
    interval_frames: u64,
    damage: f32,
    rng: SmallRng,
}

impl Raider {
    /// A raider following `config`.
    pub fn new(config: &DemoConfig, seed: u64) -> Self {
        Self {
            interval_frames: config.raid_interval_frames,
            damage: config.raid_damage,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Raid on every `interval_frames`-th frame. Half the raids go for a
    /// queen, half for her hive.
    pub fn maybe_raid(&mut self, frame: u64, territories: &mut TerritoryManager) {
        if frame.checked_rem(self.interval_frames) != Some(0) {
            return;
        }
        let targets: Vec<_> = territories
            .all_queens()
            .filter(|q| q.phase() == QueenPhase::ActiveControl)
            .map(|q| (q.id(), q.hive_id().cloned()))
            .collect();
        if targets.is_empty() {
            return;
        }
        let pick = self.rng.random_range(0..targets.len());
        let Some((queen_id, hive_id)) = targets.get(pick).cloned() else {
            return;
        };
        let outcome = match hive_id {
            Some(hive_id) if self.rng.random_bool(0.5) => {
                territories.damage_hive(&hive_id, self.damage)
            }
            _ => territories.damage_queen(queen_id, self.damage),
        };
        info!(frame, queen_id = %queen_id, ?outcome, "Raid");
    }
}
