//! The hive construction state machine.
//!
//! ```text
//! [unconstructed] --(elapsed >= duration)--> [constructed] --(health 0)--> [inactive]
//! ```
//!
//! A hive cannot be damaged until it is constructed. Its defenders are
//! spawned by an external [`crate::DefenseSpawner`]; the hive only keeps
//! their ids and prunes dead ones when asked.

use hivefall_types::{HiveId, HiveStats, ParasiteId, Position, QueenId, TerritoryId};
use rand::Rng;
use tracing::debug;

use crate::config::{
    HIVE_CONSTRUCTION_MAX_SECS, HIVE_CONSTRUCTION_MIN_SECS, HIVE_HEALTH_MAX, HIVE_HEALTH_MIN,
    HIVE_SWARM_MAX, HIVE_SWARM_MIN, HiveConfig, clamp_to,
};
use crate::events::{DamageOutcome, HiveEvent};

/// Parameters for a new hive. Health, construction time and swarm size are
/// clamped into their hard limits by [`Hive::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct HiveSpawn {
    /// Hive id.
    pub id: HiveId,
    /// Owning queen.
    pub queen_id: QueenId,
    /// Territory.
    pub territory_id: TerritoryId,
    /// Where the hive stands.
    pub position: Position,
    /// Starting (and maximum) health.
    pub health: f32,
    /// Construction time in seconds.
    pub construction_duration: f32,
    /// Defenders to request on completion.
    pub target_swarm_size: u32,
}

/// Field overrides for injecting drift from tooling and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HiveOverride {
    /// Replace construction progress.
    pub construction_progress: Option<f32>,
    /// Replace elapsed construction time.
    pub construction_elapsed: Option<f32>,
    /// Replace the constructed flag.
    pub constructed: Option<bool>,
    /// Replace the position.
    pub position: Option<Position>,
    /// Replace current health.
    pub health: Option<f32>,
}

/// A hive and its construction state.
#[derive(Debug, Clone, PartialEq)]
pub struct Hive {
    id: HiveId,
    queen_id: QueenId,
    territory_id: TerritoryId,
    position: Position,
    health: f32,
    max_health: f32,
    construction_duration: f32,
    construction_elapsed: f32,
    construction_progress: f32,
    constructed: bool,
    active: bool,
    defenders: Vec<ParasiteId>,
    target_swarm_size: u32,
}

impl Hive {
    /// Create an unconstructed hive.
    pub fn new(spawn: HiveSpawn) -> Self {
        let health = clamp_to(spawn.health, HIVE_HEALTH_MIN, HIVE_HEALTH_MAX);
        Self {
            id: spawn.id,
            queen_id: spawn.queen_id,
            territory_id: spawn.territory_id,
            position: spawn.position,
            health,
            max_health: health,
            construction_duration: clamp_to(
                spawn.construction_duration,
                HIVE_CONSTRUCTION_MIN_SECS,
                HIVE_CONSTRUCTION_MAX_SECS,
            ),
            construction_elapsed: 0.0,
            construction_progress: 0.0,
            constructed: false,
            active: true,
            defenders: Vec::new(),
            target_swarm_size: spawn.target_swarm_size.clamp(HIVE_SWARM_MIN, HIVE_SWARM_MAX),
        }
    }

    /// Create a hive with health, construction time and swarm size drawn
    /// uniformly from `config`. The id is derived from territory, queen and
    /// `created_at_ms`.
    pub fn spawn<R: Rng + ?Sized>(
        territory_id: TerritoryId,
        queen_id: QueenId,
        position: Position,
        created_at_ms: u64,
        config: &HiveConfig,
        rng: &mut R,
    ) -> Self {
        let (health_lo, health_hi) = config.health_range();
        let (build_lo, build_hi) = config.construction_range();
        let (swarm_lo, swarm_hi) = config.swarm_range();
        Self::new(HiveSpawn {
            id: HiveId::derive(territory_id, queen_id, created_at_ms),
            queen_id,
            territory_id,
            position,
            health: rng.random_range(health_lo..=health_hi),
            construction_duration: rng.random_range(build_lo..=build_hi),
            target_swarm_size: rng.random_range(swarm_lo..=swarm_hi),
        })
    }

    /// Hive id.
    pub const fn id(&self) -> &HiveId {
        &self.id
    }

    /// Owning queen.
    pub const fn queen_id(&self) -> QueenId {
        self.queen_id
    }

    /// Territory.
    pub const fn territory_id(&self) -> TerritoryId {
        self.territory_id
    }

    /// Position.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Current health.
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Health at creation.
    pub const fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Construction time in seconds.
    pub const fn construction_duration(&self) -> f32 {
        self.construction_duration
    }

    /// Construction progress in `[0, 1]`.
    pub const fn construction_progress(&self) -> f32 {
        self.construction_progress
    }

    /// Seconds of construction left; negative when overdue.
    pub fn construction_time_remaining(&self) -> f32 {
        self.construction_duration - self.construction_elapsed
    }

    /// Whether construction has completed.
    pub const fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// False once destroyed.
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Defenders requested on completion.
    pub const fn target_swarm_size(&self) -> u32 {
        self.target_swarm_size
    }

    /// Recorded defender ids, dead ones included.
    pub fn defenders(&self) -> &[ParasiteId] {
        &self.defenders
    }

    /// Advance construction by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> Vec<HiveEvent> {
        if self.constructed || !self.active {
            return Vec::new();
        }
        self.construction_elapsed += dt.max(0.0);
        self.construction_progress =
            (self.construction_elapsed / self.construction_duration).clamp(0.0, 1.0);
        if self.construction_progress >= 1.0 {
            return self.complete();
        }
        Vec::new()
    }

    /// Finish construction immediately.
    pub fn force_construction_complete(&mut self) -> Vec<HiveEvent> {
        self.construction_progress = 1.0;
        self.construction_elapsed = self.construction_elapsed.max(self.construction_duration);
        if self.constructed || !self.active {
            return Vec::new();
        }
        self.complete()
    }

    /// Move the hive.
    pub const fn relocate(&mut self, position: Position) {
        self.position = position;
    }

    /// Record the defenders spawned for this hive.
    pub fn set_defenders(&mut self, defenders: Vec<ParasiteId>) {
        self.defenders = defenders;
    }

    /// Drop defenders for which `is_alive` is false and return the rest.
    pub fn live_defenders<F>(&mut self, is_alive: F) -> &[ParasiteId]
    where
        F: Fn(ParasiteId) -> bool,
    {
        self.defenders.retain(|id| is_alive(*id));
        &self.defenders
    }

    /// Apply `amount` damage.
    ///
    /// Ignored until constructed. Reaching zero health marks the hive
    /// inactive; the caller cascades that into the queen.
    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.constructed || !self.active {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount.max(0.0)).max(0.0);
        if self.health <= 0.0 {
            self.active = false;
            debug!(hive_id = %self.id, territory_id = %self.territory_id, "Hive destroyed");
            return DamageOutcome::Destroyed;
        }
        DamageOutcome::Damaged {
            remaining: self.health,
        }
    }

    /// Write drift directly into its fields.
    pub fn apply_override(&mut self, drift: HiveOverride) {
        if let Some(progress) = drift.construction_progress {
            self.construction_progress = progress;
        }
        if let Some(elapsed) = drift.construction_elapsed {
            self.construction_elapsed = elapsed;
        }
        if let Some(constructed) = drift.constructed {
            self.constructed = constructed;
        }
        if let Some(position) = drift.position {
            self.position = position;
        }
        if let Some(health) = drift.health {
            self.health = health;
        }
    }

    /// Read-only view for the UI layer.
    pub fn stats(&self) -> HiveStats {
        HiveStats {
            hive_id: self.id.clone(),
            queen_id: self.queen_id,
            territory_id: self.territory_id.to_string(),
            health: self.health,
            max_health: self.max_health,
            construction_progress: self.construction_progress,
            constructed: self.constructed,
            active: self.active,
            defenders: u32::try_from(self.defenders.len()).unwrap_or(u32::MAX),
            target_swarm_size: self.target_swarm_size,
            position: self.position,
        }
    }

    fn complete(&mut self) -> Vec<HiveEvent> {
        self.constructed = true;
        debug!(hive_id = %self.id, territory_id = %self.territory_id, "Hive constructed");
        vec![HiveEvent::Constructed {
            hive_id: self.id.clone(),
            queen_id: self.queen_id,
            territory_id: self.territory_id,
        }]
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn make_hive(health: f32, duration: f32) -> Hive {
        Hive::new(HiveSpawn {
            id: HiveId(String::from("hive_test")),
            queen_id: QueenId::new(),
            territory_id: TerritoryId::new(0, 0),
            position: Position::ground(512.0, 512.0),
            health,
            construction_duration: duration,
            target_swarm_size: 60,
        })
    }

    #[test]
    fn values_are_clamped() {
        let hive = make_hive(5.0, 100.0);
        assert!((hive.health() - 20.0).abs() < f32::EPSILON);
        assert!((hive.construction_duration() - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn random_spawns_stay_in_range() {
        let mut rng = SmallRng::seed_from_u64(11);
        for ms in 0..200_u64 {
            let hive = Hive::spawn(
                TerritoryId::new(1, 1),
                QueenId::new(),
                Position::ground(0.0, 0.0),
                ms,
                &HiveConfig::default(),
                &mut rng,
            );
            assert!((20.0..=30.0).contains(&hive.health()));
            assert!((10.0..=15.0).contains(&hive.construction_duration()));
            assert!((50..=70).contains(&hive.target_swarm_size()));
        }
    }

    #[test]
    fn construction_completes_once() {
        let mut hive = make_hive(25.0, 10.0);
        assert!(hive.update(5.0).is_empty());
        assert!((hive.construction_progress() - 0.5).abs() < 1e-6);
        assert_eq!(hive.update(5.0).len(), 1);
        assert!(hive.is_constructed());
        assert!(hive.update(5.0).is_empty());
    }

    #[test]
    fn damage_ignored_before_construction() {
        let mut hive = make_hive(25.0, 10.0);
        assert_eq!(hive.take_damage(100.0), DamageOutcome::Ignored);
        assert!(hive.is_active());
    }

    #[test]
    fn destroyed_hive_goes_inactive() {
        let mut hive = make_hive(25.0, 10.0);
        hive.force_construction_complete();
        assert_eq!(
            hive.take_damage(5.0),
            DamageOutcome::Damaged { remaining: 20.0 }
        );
        assert_eq!(hive.take_damage(50.0), DamageOutcome::Destroyed);
        assert!(!hive.is_active());
        assert_eq!(hive.take_damage(1.0), DamageOutcome::Ignored);
    }

    #[test]
    fn forced_completion_fixes_stalled_progress() {
        let mut hive = make_hive(25.0, 10.0);
        hive.apply_override(HiveOverride {
            construction_progress: Some(0.2),
            construction_elapsed: Some(16.0),
            ..HiveOverride::default()
        });
        assert!(hive.construction_time_remaining() <= -5.0);
        let events = hive.force_construction_complete();
        assert_eq!(events.len(), 1);
        assert!((hive.construction_progress() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn dead_defenders_are_pruned_on_query() {
        let mut hive = make_hive(25.0, 10.0);
        let alive = ParasiteId::new();
        let dead = ParasiteId::new();
        hive.set_defenders(vec![alive, dead]);
        let live = hive.live_defenders(|id| id == alive);
        assert_eq!(live, &[alive]);
        assert_eq!(hive.stats().defenders, 1);
    }
}
