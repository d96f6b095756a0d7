//! The queen lifecycle state machine.
//!
//! ```text
//! UNDERGROUND_GROWTH --(growth elapses)--> HIVE_CONSTRUCTION
//!     --(hive constructed)--> ACTIVE_CONTROL --(health 0)--> destroyed
//! ```
//!
//! A queen grows underground, then builds a hive at her territory's centre.
//! Only once the hive stands is she exposed on the surface and able to take
//! damage or take control of parasites. The queen never reaches into other
//! records: the territory manager reacts to the events she returns.

use std::collections::BTreeSet;

use hivefall_types::{HiveId, ParasiteId, Position, QueenId, QueenPhase, QueenStats, TerritoryId};
use rand::Rng;
use tracing::debug;

use crate::config::{
    QUEEN_GROWTH_MAX_SECS, QUEEN_GROWTH_MIN_SECS, QUEEN_HEALTH_MAX, QUEEN_HEALTH_MIN, QueenConfig,
    clamp_to,
};
use crate::error::ColonyError;
use crate::events::{DamageOutcome, QueenEvent};

/// Depth at which a growing queen sits below the surface.
pub const UNDERGROUND_DEPTH: f32 = -10.0;

/// Parameters for a new queen. Health and growth duration are clamped into
/// their hard limits by [`Queen::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueenSpawn {
    /// Owning territory.
    pub territory_id: TerritoryId,
    /// Where the hive will stand; the queen surfaces here.
    pub hive_site: Position,
    /// Starting (and maximum) health.
    pub health: f32,
    /// Growth phase length in seconds.
    pub growth_duration: f32,
    /// Respawn generation.
    pub generation: u32,
    /// Most parasites she may control.
    pub max_controlled: u32,
}

/// Field overrides for injecting drift from tooling and tests.
///
/// Every `Some` field is written as-is, bypassing the state machine and
/// without resyncing anything else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueenOverride {
    /// Replace the phase.
    pub phase: Option<QueenPhase>,
    /// Replace the vulnerability flag.
    pub vulnerable: Option<bool>,
    /// Replace growth progress.
    pub growth_progress: Option<f32>,
    /// Replace elapsed growth time.
    pub growth_elapsed: Option<f32>,
    /// Replace the position.
    pub position: Option<Position>,
    /// Replace current health.
    pub health: Option<f32>,
    /// Replace the hive reference.
    pub hive_id: Option<Option<HiveId>>,
    /// Replace the controlled-parasite set.
    pub controlled: Option<Vec<ParasiteId>>,
}

/// A queen and her lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct Queen {
    id: QueenId,
    territory_id: TerritoryId,
    position: Position,
    hive_site: Position,
    health: f32,
    max_health: f32,
    growth_duration: f32,
    growth_elapsed: f32,
    growth_progress: f32,
    phase: QueenPhase,
    vulnerable: bool,
    destroyed: bool,
    generation: u32,
    controlled: BTreeSet<ParasiteId>,
    max_controlled: u32,
    hive_id: Option<HiveId>,
}

impl Queen {
    /// Create a queen in `UNDERGROUND_GROWTH`, below her hive site.
    pub fn new(spawn: QueenSpawn) -> Self {
        let health = clamp_to(spawn.health, QUEEN_HEALTH_MIN, QUEEN_HEALTH_MAX);
        let growth_duration = clamp_to(
            spawn.growth_duration,
            QUEEN_GROWTH_MIN_SECS,
            QUEEN_GROWTH_MAX_SECS,
        );
        Self {
            id: QueenId::new(),
            territory_id: spawn.territory_id,
            position: Position::new(spawn.hive_site.x, UNDERGROUND_DEPTH, spawn.hive_site.z),
            hive_site: spawn.hive_site,
            health,
            max_health: health,
            growth_duration,
            growth_elapsed: 0.0,
            growth_progress: 0.0,
            phase: QueenPhase::UndergroundGrowth,
            vulnerable: false,
            destroyed: false,
            generation: spawn.generation,
            controlled: BTreeSet::new(),
            max_controlled: spawn.max_controlled,
            hive_id: None,
        }
    }

    /// Create a queen with health and growth drawn uniformly from `config`.
    pub fn spawn<R: Rng + ?Sized>(
        territory_id: TerritoryId,
        hive_site: Position,
        generation: u32,
        config: &QueenConfig,
        rng: &mut R,
    ) -> Self {
        let (health_lo, health_hi) = config.health_range();
        let (growth_lo, growth_hi) = config.growth_range();
        Self::new(QueenSpawn {
            territory_id,
            hive_site,
            health: rng.random_range(health_lo..=health_hi),
            growth_duration: rng.random_range(growth_lo..=growth_hi),
            generation,
            max_controlled: config.max_controlled_parasites,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Queen id.
    pub const fn id(&self) -> QueenId {
        self.id
    }

    /// Owning territory.
    pub const fn territory_id(&self) -> TerritoryId {
        self.territory_id
    }

    /// Current position.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Where her hive stands.
    pub const fn hive_site(&self) -> Position {
        self.hive_site
    }

    /// Current health.
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Health at spawn.
    pub const fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Growth phase length in seconds.
    pub const fn growth_duration(&self) -> f32 {
        self.growth_duration
    }

    /// Growth progress in `[0, 1]`.
    pub const fn growth_progress(&self) -> f32 {
        self.growth_progress
    }

    /// Seconds of growth left; negative when overdue.
    pub fn growth_time_remaining(&self) -> f32 {
        self.growth_duration - self.growth_elapsed
    }

    /// Lifecycle phase.
    pub const fn phase(&self) -> QueenPhase {
        self.phase
    }

    /// Whether she can currently take damage.
    pub const fn is_vulnerable(&self) -> bool {
        self.vulnerable
    }

    /// Whether her health has reached zero.
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Respawn generation.
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Her hive, once construction has started.
    pub const fn hive_id(&self) -> Option<&HiveId> {
        self.hive_id.as_ref()
    }

    /// Parasites she controls, in id order.
    pub fn controlled_parasites(&self) -> impl Iterator<Item = &ParasiteId> {
        self.controlled.iter()
    }

    /// Whether she controls `parasite`.
    pub fn controls(&self, parasite: ParasiteId) -> bool {
        self.controlled.contains(&parasite)
    }

    /// Number of parasites she controls.
    pub fn controlled_count(&self) -> u32 {
        u32::try_from(self.controlled.len()).unwrap_or(u32::MAX)
    }

    /// Control limit.
    pub const fn max_controlled(&self) -> u32 {
        self.max_controlled
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Advance growth by `dt` seconds.
    ///
    /// Only the growth phase is time-driven; the other phases wait on the
    /// hive. Reaching full growth moves her to `HIVE_CONSTRUCTION`.
    pub fn update(&mut self, dt: f32) -> Vec<QueenEvent> {
        if self.destroyed || self.phase != QueenPhase::UndergroundGrowth {
            return Vec::new();
        }
        self.growth_elapsed += dt.max(0.0);
        self.growth_progress = (self.growth_elapsed / self.growth_duration).clamp(0.0, 1.0);
        if self.growth_progress >= 1.0 {
            return self.transition(QueenPhase::HiveConstruction);
        }
        Vec::new()
    }

    /// Record the hive she has started building.
    pub fn begin_hive(&mut self, hive_id: HiveId) {
        self.hive_id = Some(hive_id);
    }

    /// Forget her hive (after it was destroyed or removed).
    pub fn detach_hive(&mut self) {
        self.hive_id = None;
    }

    /// Surface over her completed hive and enter `ACTIVE_CONTROL`.
    ///
    /// # Errors
    ///
    /// Fails if she is destroyed, not in `HIVE_CONSTRUCTION`, or building a
    /// different hive.
    pub fn activate(&mut self, hive_id: &HiveId) -> Result<Vec<QueenEvent>, ColonyError> {
        if self.destroyed {
            return Err(ColonyError::QueenDestroyed(self.id));
        }
        if self.hive_id.as_ref() != Some(hive_id) {
            return Err(ColonyError::HiveMismatch {
                queen_id: self.id,
                expected: self.hive_id.clone(),
                found: hive_id.clone(),
            });
        }
        if self.phase != QueenPhase::HiveConstruction {
            return Err(ColonyError::WrongPhase {
                queen_id: self.id,
                phase: self.phase,
            });
        }
        self.position = self.hive_site;
        Ok(self.transition(QueenPhase::ActiveControl))
    }

    /// Apply `amount` damage.
    ///
    /// Ignored unless she is vulnerable. Health never drops below zero;
    /// reaching zero destroys her.
    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if self.destroyed || !self.vulnerable {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount.max(0.0)).max(0.0);
        if self.health <= 0.0 {
            self.destroyed = true;
            self.vulnerable = false;
            self.hive_id = None;
            self.controlled.clear();
            debug!(queen_id = %self.id, territory_id = %self.territory_id, "Queen destroyed");
            return DamageOutcome::Destroyed;
        }
        DamageOutcome::Damaged {
            remaining: self.health,
        }
    }

    /// Damage equal to her maximum health.
    pub fn take_lethal_damage(&mut self) -> DamageOutcome {
        let amount = self.max_health.max(self.health);
        self.take_damage(amount)
    }

    // -----------------------------------------------------------------------
    // Parasite control
    // -----------------------------------------------------------------------

    /// Take control of `parasite`.
    ///
    /// Only possible in `ACTIVE_CONTROL` and below the control limit;
    /// otherwise the request is dropped and `false` returned.
    pub fn add_controlled_parasite(&mut self, parasite: ParasiteId) -> bool {
        if self.destroyed || self.phase != QueenPhase::ActiveControl {
            return false;
        }
        if self.controlled.contains(&parasite) {
            return true;
        }
        if self.controlled_count() >= self.max_controlled {
            return false;
        }
        self.controlled.insert(parasite)
    }

    /// Release `parasite`. Always permitted.
    pub fn remove_controlled_parasite(&mut self, parasite: ParasiteId) -> bool {
        self.controlled.remove(&parasite)
    }

    // -----------------------------------------------------------------------
    // Repair
    // -----------------------------------------------------------------------

    /// Move her back underground and resync vulnerability from her phase.
    pub const fn force_underground(&mut self) {
        self.position.y = UNDERGROUND_DEPTH;
        self.vulnerable = self.phase.is_vulnerable() && !self.destroyed;
    }

    /// Mark growth as finished, entering `HIVE_CONSTRUCTION` if she was
    /// still growing.
    pub fn force_growth_complete(&mut self) -> Vec<QueenEvent> {
        self.growth_progress = 1.0;
        self.growth_elapsed = self.growth_elapsed.max(self.growth_duration);
        if self.phase == QueenPhase::UndergroundGrowth && !self.destroyed {
            return self.transition(QueenPhase::HiveConstruction);
        }
        Vec::new()
    }

    /// Drop any hive reference and return to `HIVE_CONSTRUCTION`, below
    /// ground, so a fresh hive can be started.
    ///
    /// # Errors
    ///
    /// Fails if she is destroyed.
    pub fn restart_hive_construction(&mut self) -> Result<Vec<QueenEvent>, ColonyError> {
        if self.destroyed {
            return Err(ColonyError::QueenDestroyed(self.id));
        }
        self.hive_id = None;
        self.growth_progress = 1.0;
        self.growth_elapsed = self.growth_elapsed.max(self.growth_duration);
        self.position.y = UNDERGROUND_DEPTH;
        if self.phase == QueenPhase::HiveConstruction {
            self.vulnerable = false;
            return Ok(Vec::new());
        }
        Ok(self.transition(QueenPhase::HiveConstruction))
    }

    /// Set the phase directly and resync vulnerability.
    pub fn force_phase(&mut self, phase: QueenPhase) -> Vec<QueenEvent> {
        if self.phase == phase {
            self.vulnerable = phase.is_vulnerable() && !self.destroyed;
            return Vec::new();
        }
        self.transition(phase)
    }

    /// Write drift directly into her fields.
    pub fn apply_override(&mut self, drift: QueenOverride) {
        if let Some(phase) = drift.phase {
            self.phase = phase;
        }
        if let Some(vulnerable) = drift.vulnerable {
            self.vulnerable = vulnerable;
        }
        if let Some(progress) = drift.growth_progress {
            self.growth_progress = progress;
        }
        if let Some(elapsed) = drift.growth_elapsed {
            self.growth_elapsed = elapsed;
        }
        if let Some(position) = drift.position {
            self.position = position;
        }
        if let Some(health) = drift.health {
            self.health = health;
        }
        if let Some(hive_id) = drift.hive_id {
            self.hive_id = hive_id;
        }
        if let Some(controlled) = drift.controlled {
            self.controlled = controlled.into_iter().collect();
        }
    }

    /// Read-only view for the UI layer.
    pub fn stats(&self) -> QueenStats {
        QueenStats {
            queen_id: self.id,
            territory_id: self.territory_id.to_string(),
            phase: self.phase,
            health: self.health,
            max_health: self.max_health,
            growth_progress: self.growth_progress,
            growth_time_remaining: self.growth_time_remaining(),
            vulnerable: self.vulnerable,
            generation: self.generation,
            controlled_parasites: self.controlled_count(),
            hive_id: self.hive_id.clone(),
            position: self.position,
        }
    }

    fn transition(&mut self, to: QueenPhase) -> Vec<QueenEvent> {
        let from = self.phase;
        self.phase = to;
        self.vulnerable = to.is_vulnerable();
        debug!(queen_id = %self.id, %from, %to, "Queen phase changed");
        vec![QueenEvent::PhaseChanged {
            queen_id: self.id,
            territory_id: self.territory_id,
            from,
            to,
        }]
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn make_queen(health: f32, growth: f32) -> Queen {
        Queen::new(QueenSpawn {
            territory_id: TerritoryId::new(0, 0),
            hive_site: Position::ground(512.0, 512.0),
            health,
            growth_duration: growth,
            generation: 1,
            max_controlled: 2,
        })
    }

    fn make_active_queen() -> Queen {
        let mut queen = make_queen(50.0, 60.0);
        queen.update(60.0);
        let hive = HiveId(String::from("hive_test"));
        queen.begin_hive(hive.clone());
        assert!(queen.activate(&hive).is_ok());
        queen
    }

    #[test]
    fn health_and_growth_are_clamped() {
        let low = make_queen(20.0, 10.0);
        assert!((low.health() - 40.0).abs() < f32::EPSILON);
        assert!((low.growth_duration() - 60.0).abs() < f32::EPSILON);

        let high = make_queen(150.0, 500.0);
        assert!((high.health() - 100.0).abs() < f32::EPSILON);
        assert!((high.max_health() - 100.0).abs() < f32::EPSILON);
        assert!((high.growth_duration() - 120.0).abs() < f32::EPSILON);
    }

    #[test]
    fn random_spawns_stay_in_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        let config = QueenConfig {
            health_min: -5.0,
            health_max: 900.0,
            ..QueenConfig::default()
        };
        for _ in 0..200 {
            let q = Queen::spawn(
                TerritoryId::new(0, 0),
                Position::ground(0.0, 0.0),
                1,
                &config,
                &mut rng,
            );
            assert!((40.0..=100.0).contains(&q.health()));
            assert!((60.0..=120.0).contains(&q.growth_duration()));
        }
    }

    #[test]
    fn spawns_underground_and_invulnerable() {
        let queen = make_queen(50.0, 60.0);
        assert_eq!(queen.phase(), QueenPhase::UndergroundGrowth);
        assert!(!queen.is_vulnerable());
        assert!((queen.position().y - UNDERGROUND_DEPTH).abs() < f32::EPSILON);
    }

    #[test]
    fn growth_completes_into_construction() {
        let mut queen = make_queen(50.0, 60.0);
        assert!(queen.update(30.0).is_empty());
        assert!((queen.growth_progress() - 0.5).abs() < 1e-6);

        let events = queen.update(31.0);
        assert_eq!(queen.phase(), QueenPhase::HiveConstruction);
        assert_eq!(
            events.first(),
            Some(&QueenEvent::PhaseChanged {
                queen_id: queen.id(),
                territory_id: TerritoryId::new(0, 0),
                from: QueenPhase::UndergroundGrowth,
                to: QueenPhase::HiveConstruction,
            })
        );
        assert!((queen.growth_progress() - 1.0).abs() < f32::EPSILON);
        assert!(!queen.is_vulnerable());
    }

    #[test]
    fn activation_surfaces_and_exposes_her() {
        let queen = make_active_queen();
        assert_eq!(queen.phase(), QueenPhase::ActiveControl);
        assert!(queen.is_vulnerable());
        assert!(queen.position().y.abs() < f32::EPSILON);
    }

    #[test]
    fn activation_rejects_wrong_hive() {
        let mut queen = make_queen(50.0, 60.0);
        queen.update(60.0);
        queen.begin_hive(HiveId(String::from("a")));
        let result = queen.activate(&HiveId(String::from("b")));
        assert!(matches!(result, Err(ColonyError::HiveMismatch { .. })));
    }

    #[test]
    fn damage_ignored_until_vulnerable() {
        let mut queen = make_queen(50.0, 60.0);
        assert_eq!(queen.take_damage(100.0), DamageOutcome::Ignored);
        assert!((queen.health() - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn damage_floors_at_zero_and_destroys() {
        let mut queen = make_active_queen();
        assert_eq!(
            queen.take_damage(20.0),
            DamageOutcome::Damaged { remaining: 30.0 }
        );
        assert_eq!(queen.take_damage(500.0), DamageOutcome::Destroyed);
        assert!(queen.health().abs() < f32::EPSILON);
        assert!(queen.is_destroyed());
        assert_eq!(queen.take_damage(1.0), DamageOutcome::Ignored);
    }

    #[test]
    fn parasite_control_requires_active_phase_and_respects_limit() {
        let mut growing = make_queen(50.0, 60.0);
        assert!(!growing.add_controlled_parasite(ParasiteId::new()));
        assert_eq!(growing.controlled_count(), 0);

        let mut queen = make_active_queen();
        let a = ParasiteId::new();
        assert!(queen.add_controlled_parasite(a));
        assert!(queen.add_controlled_parasite(ParasiteId::new()));
        assert!(!queen.add_controlled_parasite(ParasiteId::new()));
        assert_eq!(queen.controlled_count(), 2);

        assert!(queen.remove_controlled_parasite(a));
        assert!(!queen.remove_controlled_parasite(a));
        assert_eq!(queen.controlled_count(), 1);
    }

    #[test]
    fn force_underground_resyncs_vulnerability() {
        let mut queen = make_queen(50.0, 60.0);
        queen.apply_override(QueenOverride {
            vulnerable: Some(true),
            position: Some(Position::ground(512.0, 512.0)),
            ..QueenOverride::default()
        });
        assert!(queen.is_vulnerable());
        queen.force_underground();
        assert!(!queen.is_vulnerable());
        assert!((queen.position().y + 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn force_growth_complete_moves_to_construction() {
        let mut queen = make_queen(50.0, 60.0);
        let events = queen.force_growth_complete();
        assert_eq!(events.len(), 1);
        assert_eq!(queen.phase(), QueenPhase::HiveConstruction);
        assert!(queen.force_growth_complete().is_empty());
    }

    #[test]
    fn restart_construction_drops_hive() {
        let mut queen = make_active_queen();
        queen.apply_override(QueenOverride {
            hive_id: Some(None),
            ..QueenOverride::default()
        });
        let events = queen.restart_hive_construction();
        assert!(events.is_ok_and(|e| e.len() == 1));
        assert_eq!(queen.phase(), QueenPhase::HiveConstruction);
        assert!(queen.hive_id().is_none());
        assert!(!queen.is_vulnerable());
    }

    #[test]
    fn stats_reflect_state() {
        let queen = make_active_queen();
        let stats = queen.stats();
        assert_eq!(stats.phase, QueenPhase::ActiveControl);
        assert!(stats.vulnerable);
        assert_eq!(stats.generation, 1);
        assert_eq!(stats.territory_id, "territory_0_0");
    }
}
