//! Territory orchestration: creation, queen and hive lifecycles, and the
//! liberation-to-respawn cycle.
//!
//! The manager is the single owner of every territorial record. Territories
//! live in the [`TerritoryStore`]; queens and hives live in id-keyed
//! registries here, and the records refer to each other by id only. All
//! mutation of those records (gameplay, combat and the recovery layer's
//! repairs) goes through the methods on this type.
//!
//! Lookups by id return `Option`. Calls that name an unknown territory,
//! queen or hive are silent no-ops.

use std::collections::BTreeMap;

use hivefall_colony::{
    ColonyConfig, ColonyError, DamageOutcome, DefenseSpawner, Hive, HiveEvent, LiberationManager,
    Queen, QueenEvent,
};
use hivefall_types::{
    ControlStatus, HiveId, HiveStats, LiberationReason, ParasiteId, Position, QueenId, QueenPhase,
    QueenStats, TerritoryId, TerritorySnapshot,
};
use hivefall_world::{Territory, TerritoryGrid, TerritoryStore};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::events::{TerritoryEvent, TerritoryObserver};
use crate::throttle::UpdateThrottle;

/// Owner of territories, queens and hives.
pub struct TerritoryManager {
    store: TerritoryStore,
    queens: BTreeMap<QueenId, Queen>,
    hives: BTreeMap<HiveId, Hive>,
    generations: BTreeMap<TerritoryId, u32>,
    liberation: Option<LiberationManager>,
    spawner: Option<Box<dyn DefenseSpawner>>,
    observers: Vec<Box<dyn TerritoryObserver>>,
    events: Vec<TerritoryEvent>,
    config: ColonyConfig,
    throttle: UpdateThrottle,
    rng: SmallRng,
    elapsed_ms: u64,
    disposed: bool,
}

impl std::fmt::Debug for TerritoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerritoryManager")
            .field("territories", &self.store.len())
            .field("queens", &self.queens.len())
            .field("hives", &self.hives.len())
            .field("liberation", &self.liberation)
            .field("pending_events", &self.events.len())
            .field("elapsed_ms", &self.elapsed_ms)
            .finish_non_exhaustive()
    }
}

impl TerritoryManager {
    /// An empty manager over `grid`, drawing randomness from `seed`.
    pub fn new(grid: TerritoryGrid, config: ColonyConfig, seed: u64) -> Self {
        Self {
            store: TerritoryStore::new(grid),
            queens: BTreeMap::new(),
            hives: BTreeMap::new(),
            generations: BTreeMap::new(),
            liberation: None,
            spawner: None,
            observers: Vec::new(),
            events: Vec::new(),
            config,
            throttle: UpdateThrottle::default(),
            rng: SmallRng::seed_from_u64(seed),
            elapsed_ms: 0,
            disposed: false,
        }
    }

    /// Attach a liberation manager. Without one, liberation windows fall
    /// back to a plain countdown on the territory.
    #[must_use]
    pub fn with_liberation(mut self, liberation: LiberationManager) -> Self {
        self.liberation = Some(liberation);
        self
    }

    /// Attach the spawner that populates completed hives with defenders.
    #[must_use]
    pub fn with_defense_spawner(mut self, spawner: Box<dyn DefenseSpawner>) -> Self {
        self.set_defense_spawner(spawner);
        self
    }

    /// Attach or replace the defender spawner in place.
    pub fn set_defense_spawner(&mut self, spawner: Box<dyn DefenseSpawner>) {
        self.spawner = Some(spawner);
    }

    /// Replace the frame-time thresholds of the update throttle.
    #[must_use]
    pub fn with_frame_time_thresholds(mut self, thresholds_ms: Vec<f32>) -> Self {
        self.throttle = UpdateThrottle::new(thresholds_ms);
        self
    }

    /// Register an observer for territory events.
    pub fn subscribe(&mut self, observer: Box<dyn TerritoryObserver>) {
        self.observers.push(observer);
    }

    /// Take every event published since the last drain.
    pub fn drain_events(&mut self) -> Vec<TerritoryEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Territories
    // -----------------------------------------------------------------------

    /// Create the territory containing `(x, z)` unless it exists.
    ///
    /// The point is snapped to the centre of its grid cell first, so the
    /// result is always grid-aligned. Returns the territory id either way.
    pub fn create_territory(&mut self, x: f32, z: f32) -> TerritoryId {
        let center = self.store.grid().aligned_center(x, z);
        let (id, created) = self.store.create_at(center.x, center.z);
        if created {
            self.publish(TerritoryEvent::TerritoryCreated { territory_id: id });
        }
        id
    }

    /// Insert a pre-built territory, replacing any record with the same id.
    ///
    /// Used for scenario setup and save loading; the territory may carry an
    /// off-grid centre.
    pub fn insert_territory(&mut self, territory: Territory) {
        let id = territory.id();
        if self.store.insert(territory).is_none() {
            self.publish(TerritoryEvent::TerritoryCreated { territory_id: id });
        }
    }

    /// The existing territory containing `(x, z)`.
    pub fn get_territory_at(&self, x: f32, z: f32) -> Option<&Territory> {
        self.store.territory_at(x, z)
    }

    /// Look up a territory.
    pub fn get_territory(&self, id: TerritoryId) -> Option<&Territory> {
        self.store.get(id)
    }

    /// Look up a territory by its text id.
    pub fn get_territory_by_key(&self, key: &str) -> Option<&Territory> {
        self.store.get_by_key(key)
    }

    /// All territories in id order.
    pub fn all_territories(&self) -> impl Iterator<Item = &Territory> {
        self.store.iter()
    }

    /// The territory store.
    pub const fn store(&self) -> &TerritoryStore {
        &self.store
    }

    /// Snap a territory back onto its grid cell. `None` if it is unknown,
    /// otherwise whether anything moved.
    pub fn realign_territory(&mut self, id: TerritoryId) -> Option<bool> {
        self.store.realign(id)
    }

    /// Whether the territory is in a liberation window.
    pub fn is_territory_liberated(&self, id: TerritoryId) -> bool {
        self.store
            .get(id)
            .is_some_and(|t| t.control_status() == ControlStatus::Liberated)
    }

    /// Mining-speed bonus at `position`.
    pub fn mining_bonus_at(&self, position: &Position) -> f32 {
        if let Some(liberation) = &self.liberation {
            return liberation.mining_bonus_at(position, Some(&self.store));
        }
        self.store
            .territory_at(position.x, position.z)
            .filter(|t| t.control_status() == ControlStatus::Liberated)
            .map_or(0.0, |_| self.config.liberation.mining_bonus)
    }

    /// Read-only views of every territory.
    pub fn territory_snapshots(&self) -> Vec<TerritorySnapshot> {
        self.store.iter().map(Territory::snapshot).collect()
    }

    // -----------------------------------------------------------------------
    // Queens and hives
    // -----------------------------------------------------------------------

    /// Every live queen in id order.
    pub fn all_queens(&self) -> impl Iterator<Item = &Queen> {
        self.queens.values()
    }

    /// Look up a queen.
    pub fn queen(&self, id: QueenId) -> Option<&Queen> {
        self.queens.get(&id)
    }

    /// Look up a queen mutably. Intended for tooling and tests that inject
    /// drift; gameplay goes through the manager's own methods.
    pub fn queen_mut(&mut self, id: QueenId) -> Option<&mut Queen> {
        self.queens.get_mut(&id)
    }

    /// The queen controlling `territory`.
    pub fn queen_for_territory(&self, territory: TerritoryId) -> Option<&Queen> {
        self.store
            .get(territory)
            .and_then(Territory::queen_id)
            .and_then(|id| self.queens.get(&id))
    }

    /// Every hive in id order.
    pub fn all_hives(&self) -> impl Iterator<Item = &Hive> {
        self.hives.values()
    }

    /// Look up a hive.
    pub fn hive(&self, id: &HiveId) -> Option<&Hive> {
        self.hives.get(id)
    }

    /// Look up a hive mutably. Intended for tooling and tests.
    pub fn hive_mut(&mut self, id: &HiveId) -> Option<&mut Hive> {
        self.hives.get_mut(id)
    }

    /// Read-only views of every queen.
    pub fn queen_stats(&self) -> Vec<QueenStats> {
        self.queens.values().map(Queen::stats).collect()
    }

    /// Read-only views of every hive.
    pub fn hive_stats(&self) -> Vec<HiveStats> {
        self.hives.values().map(Hive::stats).collect()
    }

    /// Generation of the most recent queen spawned in `territory`.
    pub fn generation_of(&self, territory: TerritoryId) -> Option<u32> {
        self.generations.get(&territory).copied()
    }

    /// Spawn a queen in `territory`.
    ///
    /// Returns the existing queen if the territory already has one, and
    /// `None` if the territory is unknown. Health and growth time are drawn
    /// from the colony config.
    pub fn create_queen_for_territory(
        &mut self,
        territory: TerritoryId,
        generation: u32,
    ) -> Option<QueenId> {
        let t = self.store.get(territory)?;
        if let Some(existing) = t.queen_id().filter(|id| self.queens.contains_key(id)) {
            return Some(existing);
        }
        let site = Position::ground(t.center().x, t.center().z);
        let queen = Queen::spawn(territory, site, generation, &self.config.queen, &mut self.rng);
        let queen_id = queen.id();

        if let Some(t) = self.store.get_mut(territory) {
            t.clear_control();
            t.set_liberation_timer(0.0);
            t.assign_queen(queen_id);
        }
        self.queens.insert(queen_id, queen);
        self.generations.insert(territory, generation);
        info!(territory_id = %territory, queen_id = %queen_id, generation, "Queen spawned");
        self.publish(TerritoryEvent::QueenSpawned {
            queen_id,
            territory_id: territory,
            generation,
        });
        Some(queen_id)
    }

    /// Start (or restart) hive construction for a queen.
    ///
    /// A queen outside `HIVE_CONSTRUCTION` is moved back into it. Every hive
    /// registered to her is discarded, including ones she no longer
    /// references, and a fresh one is created at her hive site.
    ///
    /// # Errors
    ///
    /// Fails if the queen is unknown or destroyed.
    pub fn start_hive_construction(&mut self, queen_id: QueenId) -> Result<HiveId, ColonyError> {
        let queen = self
            .queens
            .get_mut(&queen_id)
            .ok_or(ColonyError::QueenNotFound(queen_id))?;
        let phase_events = queen.restart_hive_construction()?;
        let territory = queen.territory_id();
        let site = queen.hive_site();

        let stale = self.hives.len();
        self.hives.retain(|_, hive| hive.queen_id() != queen_id);
        let discarded = stale.saturating_sub(self.hives.len());
        if discarded > 0 {
            debug!(queen_id = %queen_id, discarded, "Stale hives discarded");
        }
        let hive = Hive::spawn(
            territory,
            queen_id,
            site,
            self.elapsed_ms,
            &self.config.hive,
            &mut self.rng,
        );
        let hive_id = hive.id().clone();
        if let Some(queen) = self.queens.get_mut(&queen_id) {
            queen.begin_hive(hive_id.clone());
        }
        if let Some(t) = self.store.get_mut(territory) {
            t.set_hive(Some(hive_id.clone()));
        }
        self.hives.insert(hive_id.clone(), hive);

        for event in phase_events {
            self.publish_queen_event(event);
        }
        debug!(hive_id = %hive_id, queen_id = %queen_id, "Hive construction started");
        self.publish(TerritoryEvent::HiveConstructionStarted {
            hive_id: hive_id.clone(),
            queen_id,
            territory_id: territory,
        });
        Ok(hive_id)
    }

    /// Finish a hive's construction now and activate its queen.
    ///
    /// # Errors
    ///
    /// Fails if the hive is unknown, or if its queen cannot be activated.
    pub fn force_hive_completion(&mut self, hive_id: &HiveId) -> Result<(), ColonyError> {
        let hive = self
            .hives
            .get_mut(hive_id)
            .ok_or_else(|| ColonyError::HiveNotFound(hive_id.clone()))?;
        let events = hive.force_construction_complete();
        if events.is_empty() {
            // Already constructed: make sure the queen caught up.
            let queen_id = hive.queen_id();
            return self.activate_queen(queen_id, hive_id);
        }
        let mut result = Ok(());
        for event in events {
            if let Err(err) = self.handle_hive_event(event) {
                result = Err(err);
            }
        }
        result
    }

    /// Finish a queen's growth now; she moves on to hive construction.
    ///
    /// # Errors
    ///
    /// Fails if the queen is unknown or hive construction cannot start.
    pub fn force_growth_complete(&mut self, queen_id: QueenId) -> Result<(), ColonyError> {
        let queen = self
            .queens
            .get_mut(&queen_id)
            .ok_or(ColonyError::QueenNotFound(queen_id))?;
        let events = queen.force_growth_complete();
        let needs_hive = queen.phase() == QueenPhase::HiveConstruction && queen.hive_id().is_none();
        for event in events {
            self.handle_queen_event(event);
        }
        if needs_hive && self.queens.get(&queen_id).is_some_and(|q| q.hive_id().is_none()) {
            self.start_hive_construction(queen_id)?;
        }
        Ok(())
    }

    /// Put a queen into `phase` directly, starting a hive if the new phase
    /// needs one and she has none.
    ///
    /// # Errors
    ///
    /// Fails if the queen is unknown.
    pub fn force_queen_phase(
        &mut self,
        queen_id: QueenId,
        phase: QueenPhase,
    ) -> Result<(), ColonyError> {
        let queen = self
            .queens
            .get_mut(&queen_id)
            .ok_or(ColonyError::QueenNotFound(queen_id))?;
        let events = queen.force_phase(phase);
        for event in events {
            self.handle_queen_event(event);
        }
        Ok(())
    }

    /// Move a hive back onto its queen's hive site.
    ///
    /// # Errors
    ///
    /// Fails if the hive or its queen is unknown.
    pub fn reseat_hive(&mut self, hive_id: &HiveId) -> Result<(), ColonyError> {
        let queen_id = self
            .hives
            .get(hive_id)
            .map(Hive::queen_id)
            .ok_or_else(|| ColonyError::HiveNotFound(hive_id.clone()))?;
        let site = self
            .queens
            .get(&queen_id)
            .map(Queen::hive_site)
            .ok_or(ColonyError::QueenNotFound(queen_id))?;
        if let Some(hive) = self.hives.get_mut(hive_id) {
            hive.relocate(site);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Combat
    // -----------------------------------------------------------------------

    /// Damage a queen. Destroying her liberates her territory.
    pub fn damage_queen(&mut self, queen_id: QueenId, amount: f32) -> DamageOutcome {
        let Some(queen) = self.queens.get_mut(&queen_id) else {
            return DamageOutcome::Ignored;
        };
        let outcome = queen.take_damage(amount);
        if outcome.is_destroyed() {
            self.on_queen_destroyed(queen_id);
        }
        outcome
    }

    /// Damage a hive. Destroying it deals lethal damage to its queen, unless
    /// she has already moved on to a different hive.
    pub fn damage_hive(&mut self, hive_id: &HiveId, amount: f32) -> DamageOutcome {
        let Some(hive) = self.hives.get_mut(hive_id) else {
            return DamageOutcome::Ignored;
        };
        let outcome = hive.take_damage(amount);
        if !outcome.is_destroyed() {
            return outcome;
        }

        let queen_id = hive.queen_id();
        let territory = hive.territory_id();
        self.hives.remove(hive_id);
        if let Some(t) = self.store.get_mut(territory) {
            if t.hive_id() == Some(hive_id) {
                t.set_hive(None);
            }
        }
        info!(hive_id = %hive_id, territory_id = %territory, "Hive destroyed");
        self.publish(TerritoryEvent::HiveDestroyed {
            hive_id: hive_id.clone(),
            queen_id,
            territory_id: territory,
        });

        if let Some(queen) = self
            .queens
            .get_mut(&queen_id)
            .filter(|q| q.hive_id() == Some(hive_id))
        {
            queen.detach_hive();
            if queen.take_lethal_damage().is_destroyed() {
                self.on_queen_destroyed(queen_id);
            }
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Parasite control
    // -----------------------------------------------------------------------

    /// Put `parasite` under `queen`'s control. Returns whether she now
    /// controls it.
    pub fn assign_parasite(&mut self, queen_id: QueenId, parasite: ParasiteId) -> bool {
        let Some(queen) = self.queens.get_mut(&queen_id) else {
            return false;
        };
        let added = queen.add_controlled_parasite(parasite);
        self.sync_parasite_count(queen_id);
        added
    }

    /// Release `parasite` from `queen`. Returns whether she controlled it.
    pub fn release_parasite(&mut self, queen_id: QueenId, parasite: ParasiteId) -> bool {
        let Some(queen) = self.queens.get_mut(&queen_id) else {
            return false;
        };
        let removed = queen.remove_controlled_parasite(parasite);
        self.sync_parasite_count(queen_id);
        removed
    }

    /// Queens whose controlled set contains `parasite`.
    pub fn controllers_of(&self, parasite: ParasiteId) -> Vec<QueenId> {
        self.queens
            .values()
            .filter(|q| q.controls(parasite))
            .map(Queen::id)
            .collect()
    }

    /// Make every territory's parasite count match its queen's controlled
    /// set. Returns how many territories were corrected.
    pub fn reconcile_parasite_counts(&mut self) -> usize {
        let mut fixed = 0_usize;
        for territory in self.store.iter_mut() {
            let expected = territory
                .queen_id()
                .and_then(|id| self.queens.get(&id))
                .map_or(0, Queen::controlled_count);
            if territory.parasite_count() != expected {
                territory.set_parasite_count(expected);
                fixed = fixed.saturating_add(1);
            }
        }
        if fixed > 0 {
            debug!(fixed, "Parasite counts reconciled");
        }
        fixed
    }

    // -----------------------------------------------------------------------
    // Liberation
    // -----------------------------------------------------------------------

    /// Liberate a territory: drop its queen and hive and open a liberation
    /// window. Returns `false` for an unknown territory.
    pub fn liberate_territory(
        &mut self,
        territory: TerritoryId,
        queen_id: Option<QueenId>,
    ) -> bool {
        let reason = if queen_id.is_some() {
            LiberationReason::QueenDestroyed
        } else {
            LiberationReason::Manual
        };
        self.liberate(territory, queen_id, reason)
    }

    /// The attached liberation manager.
    pub const fn liberation(&self) -> Option<&LiberationManager> {
        self.liberation.as_ref()
    }

    /// The attached liberation manager, mutably.
    pub const fn liberation_mut(&mut self) -> Option<&mut LiberationManager> {
        self.liberation.as_mut()
    }

    // -----------------------------------------------------------------------
    // Frame update
    // -----------------------------------------------------------------------

    /// Report the latest frame time; returns the new update interval.
    pub fn report_frame_time(&mut self, frame_ms: f32) -> u32 {
        self.throttle.report_frame_time(frame_ms)
    }

    /// Current update interval in frames.
    pub const fn update_interval(&self) -> u32 {
        self.throttle.interval()
    }

    /// Manager time in milliseconds (sum of all applied updates).
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Advance queens, hives and liberation windows by `dt` seconds.
    ///
    /// Subject to the update throttle: skipped frames carry their time
    /// forward to the next frame that updates.
    pub fn update(&mut self, dt: f32) {
        if self.disposed {
            return;
        }
        let Some(step) = self.throttle.admit(dt) else {
            return;
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let step_ms = (f64::from(step) * 1000.0).round() as u64;
        self.elapsed_ms = self.elapsed_ms.saturating_add(step_ms);

        let hive_ids: Vec<HiveId> = self.hives.keys().cloned().collect();
        let queen_ids: Vec<QueenId> = self.queens.keys().copied().collect();

        for queen_id in queen_ids {
            let events = self
                .queens
                .get_mut(&queen_id)
                .map(|q| q.update(step))
                .unwrap_or_default();
            for event in events {
                self.handle_queen_event(event);
            }
        }

        for hive_id in hive_ids {
            let events = self
                .hives
                .get_mut(&hive_id)
                .map(|h| h.update(step))
                .unwrap_or_default();
            for event in events {
                if let Err(err) = self.handle_hive_event(event) {
                    warn!(hive_id = %hive_id, %err, "Hive completion could not activate queen");
                }
            }
        }

        self.update_liberations(step);
    }

    /// Drop every record, observer and pending event. Later updates do
    /// nothing.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.queens.clear();
        self.hives.clear();
        self.generations.clear();
        self.observers.clear();
        self.events.clear();
        self.spawner = None;
        if let Some(liberation) = self.liberation.as_mut() {
            liberation.dispose();
        }
        self.store.clear();
    }

    /// Whether [`Self::dispose`] has been called.
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn update_liberations(&mut self, step: f32) {
        if let Some(liberation) = self.liberation.as_mut() {
            let events = liberation.update_liberations(step);
            for event in events {
                self.publish(TerritoryEvent::Liberation(event));
            }
        }

        let liberated: Vec<TerritoryId> = self
            .store
            .iter()
            .filter(|t| t.control_status() == ControlStatus::Liberated)
            .map(Territory::id)
            .collect();

        for id in liberated {
            let remaining = match &self.liberation {
                Some(liberation) => liberation
                    .get_liberation_status(id)
                    .map_or(0.0, |status| status.time_remaining),
                None => self
                    .store
                    .get(id)
                    .map_or(0.0, |t| t.liberation_timer() - step),
            };
            if remaining > 0.0 {
                if let Some(t) = self.store.get_mut(id) {
                    t.set_liberation_timer(remaining);
                }
            } else {
                self.end_liberation(id);
            }
        }
    }

    fn end_liberation(&mut self, territory: TerritoryId) {
        if let Some(t) = self.store.get_mut(territory) {
            t.set_liberation_timer(0.0);
            t.set_control_status(ControlStatus::Contested);
        }
        info!(territory_id = %territory, "Territory contested");
        self.publish(TerritoryEvent::TerritoryContested {
            territory_id: territory,
        });
        let generation = self
            .generations
            .get(&territory)
            .copied()
            .unwrap_or(0)
            .saturating_add(1);
        self.create_queen_for_territory(territory, generation);
    }

    fn liberate(
        &mut self,
        territory: TerritoryId,
        queen_id: Option<QueenId>,
        reason: LiberationReason,
    ) -> bool {
        let Some(t) = self.store.get_mut(territory) else {
            return false;
        };
        let resident = t.queen_id();
        let hive = t.hive_id().cloned();
        t.clear_control();
        t.set_control_status(ControlStatus::Liberated);

        for id in [resident, queen_id].into_iter().flatten() {
            if let Some(queen) = self.queens.remove(&id) {
                if let Some(h) = queen.hive_id() {
                    self.hives.remove(h);
                }
            }
        }
        if let Some(h) = hive {
            self.hives.remove(&h);
        }

        let duration = if let Some(liberation) = self.liberation.as_mut() {
            let events = liberation.start_liberation(territory, queen_id, reason);
            let duration = liberation
                .get_liberation_status(territory)
                .map_or(0.0, |status| status.time_remaining);
            for event in events {
                self.publish(TerritoryEvent::Liberation(event));
            }
            duration
        } else {
            let (lo, hi) = self.config.liberation.duration_range();
            self.rng.random_range(lo..=hi)
        };
        if let Some(t) = self.store.get_mut(territory) {
            t.set_liberation_timer(duration);
        }
        info!(territory_id = %territory, %reason, duration, "Territory liberated");
        self.publish(TerritoryEvent::TerritoryLiberated {
            territory_id: territory,
            queen_id,
            duration,
        });
        true
    }

    fn on_queen_destroyed(&mut self, queen_id: QueenId) {
        let Some(queen) = self.queens.get(&queen_id) else {
            return;
        };
        let territory = queen.territory_id();
        let generation = queen.generation();
        info!(queen_id = %queen_id, territory_id = %territory, generation, "Queen destroyed");
        self.publish(TerritoryEvent::QueenDestroyed {
            queen_id,
            territory_id: territory,
            generation,
        });
        let owns_territory = self
            .store
            .get(territory)
            .is_some_and(|t| t.queen_id() == Some(queen_id));
        if owns_territory {
            self.liberate(territory, Some(queen_id), LiberationReason::QueenDestroyed);
        } else {
            self.queens.remove(&queen_id);
        }
    }

    fn activate_queen(&mut self, queen_id: QueenId, hive_id: &HiveId) -> Result<(), ColonyError> {
        let queen = self
            .queens
            .get_mut(&queen_id)
            .ok_or(ColonyError::QueenNotFound(queen_id))?;
        if queen.phase() == QueenPhase::ActiveControl && queen.hive_id() == Some(hive_id) {
            return Ok(());
        }
        let events = queen.activate(hive_id)?;
        for event in events {
            self.handle_queen_event(event);
        }
        Ok(())
    }

    fn handle_queen_event(&mut self, event: QueenEvent) {
        let QueenEvent::PhaseChanged { queen_id, to, .. } = event;
        self.publish_queen_event(event);
        let needs_hive = to == QueenPhase::HiveConstruction
            && self
                .queens
                .get(&queen_id)
                .is_some_and(|q| q.hive_id().is_none());
        if needs_hive {
            if let Err(err) = self.start_hive_construction(queen_id) {
                warn!(queen_id = %queen_id, %err, "Hive construction could not start");
            }
        }
    }

    fn publish_queen_event(&mut self, event: QueenEvent) {
        let QueenEvent::PhaseChanged {
            queen_id,
            territory_id,
            from,
            to,
        } = event;
        self.publish(TerritoryEvent::QueenPhaseChanged {
            queen_id,
            territory_id,
            from,
            to,
        });
    }

    fn handle_hive_event(&mut self, event: HiveEvent) -> Result<(), ColonyError> {
        let HiveEvent::Constructed {
            hive_id,
            queen_id,
            territory_id,
        } = event;

        let mut defenders = 0_u32;
        if let Some(hive) = self.hives.get_mut(&hive_id) {
            if let Some(spawner) = self.spawner.as_mut() {
                let ids =
                    spawner.spawn_defenders(&hive_id, hive.position(), hive.target_swarm_size());
                hive.set_defenders(ids);
            }
            defenders = u32::try_from(hive.defenders().len()).unwrap_or(u32::MAX);
        }
        info!(hive_id = %hive_id, territory_id = %territory_id, defenders, "Hive constructed");
        self.publish(TerritoryEvent::HiveConstructed {
            hive_id: hive_id.clone(),
            queen_id,
            territory_id,
            defenders,
        });
        self.activate_queen(queen_id, &hive_id)
    }

    fn sync_parasite_count(&mut self, queen_id: QueenId) {
        let Some(queen) = self.queens.get(&queen_id) else {
            return;
        };
        let count = queen.controlled_count();
        if let Some(t) = self.store.get_mut(queen.territory_id()) {
            if t.queen_id() == Some(queen_id) {
                t.set_parasite_count(count);
            }
        }
    }

    fn publish(&mut self, event: TerritoryEvent) {
        for observer in &mut self.observers {
            observer.on_territory_event(&event);
        }
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use hivefall_colony::{HiveSpawn, LiberationConfig, QueenOverride};

    use super::*;

    fn make_manager() -> TerritoryManager {
        TerritoryManager::new(TerritoryGrid::new(), ColonyConfig::default(), 9)
    }

    fn make_manager_with_liberation(duration: f32) -> TerritoryManager {
        let config = LiberationConfig {
            duration_min_secs: duration,
            duration_max_secs: duration,
            ..LiberationConfig::default()
        };
        make_manager().with_liberation(LiberationManager::new(config, 9))
    }

    /// Spawn a queen at the origin and run her through growth and hive
    /// construction.
    fn make_active_queen(manager: &mut TerritoryManager) -> QueenId {
        let territory = manager.create_territory(100.0, 100.0);
        let queen = manager.create_queen_for_territory(territory, 1);
        let queen = queen.unwrap_or_default();
        manager.update(120.0);
        manager.update(15.0);
        queen
    }

    struct CountingSpawner(u32);

    impl DefenseSpawner for CountingSpawner {
        fn spawn_defenders(
            &mut self,
            _hive: &HiveId,
            _position: Position,
            count: u32,
        ) -> Vec<ParasiteId> {
            self.0 = self.0.saturating_add(count);
            (0..count).map(|_| ParasiteId::new()).collect()
        }
    }

    struct Recorder(Rc<RefCell<Vec<TerritoryEvent>>>);

    impl TerritoryObserver for Recorder {
        fn on_territory_event(&mut self, event: &TerritoryEvent) {
            self.0.borrow_mut().push(event.clone());
        }
    }

    #[test]
    fn create_territory_aligns_and_is_idempotent() {
        let mut manager = make_manager();
        let a = manager.create_territory(1500.0, -20.0);
        let b = manager.create_territory(1100.0, -1000.0);
        assert_eq!(a, b);
        assert_eq!(a, TerritoryId::new(1, -1));
        let t = manager.get_territory(a);
        assert!(t.is_some_and(|t| t.control_status() == ControlStatus::Contested));
        assert!(t.is_some_and(|t| (t.center().x - 1536.0).abs() < f32::EPSILON));
        assert_eq!(manager.all_territories().count(), 1);
        assert_eq!(manager.drain_events().len(), 1);
    }

    #[test]
    fn unknown_ids_are_silent() {
        let mut manager = make_manager();
        assert!(manager.create_queen_for_territory(TerritoryId::new(4, 4), 1).is_none());
        assert!(!manager.liberate_territory(TerritoryId::new(4, 4), None));
        assert_eq!(manager.damage_queen(QueenId::new(), 10.0), DamageOutcome::Ignored);
        assert!(!manager.assign_parasite(QueenId::new(), ParasiteId::new()));
        assert!(manager.get_territory_at(5.0, 5.0).is_none());
    }

    #[test]
    fn queen_creation_is_idempotent_and_takes_control() {
        let mut manager = make_manager();
        let territory = manager.create_territory(0.0, 0.0);
        let first = manager.create_queen_for_territory(territory, 1);
        let second = manager.create_queen_for_territory(territory, 5);
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(manager.all_queens().count(), 1);
        assert_eq!(
            manager.get_territory(territory).map(Territory::control_status),
            Some(ControlStatus::QueenControlled)
        );
        assert_eq!(manager.generation_of(territory), Some(1));
    }

    #[test]
    fn queen_grows_builds_and_activates() {
        let mut manager = make_manager().with_defense_spawner(Box::new(CountingSpawner(0)));
        let queen_id = make_active_queen(&mut manager);
        let queen = manager.queen(queen_id);
        assert_eq!(queen.map(Queen::phase), Some(QueenPhase::ActiveControl));
        assert!(queen.is_some_and(Queen::is_vulnerable));

        let hive_id = queen.and_then(|q| q.hive_id().cloned());
        let hive = hive_id.as_ref().and_then(|id| manager.hive(id));
        assert!(hive.is_some_and(Hive::is_constructed));
        assert!(hive.is_some_and(|h| (50..=70).contains(&h.defenders().len())));

        let territory = manager.get_territory(TerritoryId::new(0, 0));
        assert_eq!(territory.and_then(Territory::hive_id), hive_id.as_ref());
    }

    #[test]
    fn destroying_queen_liberates_territory() {
        let mut manager = make_manager_with_liberation(200.0);
        let queen_id = make_active_queen(&mut manager);
        assert_eq!(manager.damage_queen(queen_id, 1000.0), DamageOutcome::Destroyed);

        let territory = TerritoryId::new(0, 0);
        assert!(manager.is_territory_liberated(territory));
        assert!(manager.queen(queen_id).is_none());
        assert_eq!(manager.all_hives().count(), 0);
        let t = manager.get_territory(territory);
        assert!(t.is_some_and(|t| t.queen_id().is_none() && t.hive_id().is_none()));
        assert!(t.is_some_and(|t| (t.liberation_timer() - 200.0).abs() < f32::EPSILON));
        let bonus = manager.mining_bonus_at(&Position::ground(10.0, 10.0));
        assert!((bonus - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn destroying_hive_cascades_to_queen() {
        let mut manager = make_manager_with_liberation(200.0);
        let queen_id = make_active_queen(&mut manager);
        let hive_id = manager
            .queen(queen_id)
            .and_then(|q| q.hive_id().cloned())
            .unwrap_or_else(|| HiveId(String::new()));
        assert_eq!(manager.damage_hive(&hive_id, 1000.0), DamageOutcome::Destroyed);
        assert!(manager.queen(queen_id).is_none());
        assert!(manager.is_territory_liberated(TerritoryId::new(0, 0)));
        let events = manager.drain_events();
        assert!(events.iter().any(|e| matches!(e, TerritoryEvent::HiveDestroyed { .. })));
        assert!(events.iter().any(|e| matches!(e, TerritoryEvent::QueenDestroyed { .. })));
    }

    #[test]
    fn liberation_expiry_respawns_next_generation() {
        let mut manager = make_manager_with_liberation(200.0);
        let territory = manager.create_territory(0.0, 0.0);
        manager.create_queen_for_territory(territory, 3);
        manager.liberate_territory(territory, None);

        manager.update(199.0);
        assert!(manager.is_territory_liberated(territory));
        manager.update(1.1);
        let t = manager.get_territory(territory);
        assert_eq!(t.map(Territory::control_status), Some(ControlStatus::QueenControlled));
        let queen = manager.queen_for_territory(territory);
        assert_eq!(queen.map(Queen::generation), Some(4));
    }

    #[test]
    fn fallback_timer_without_liberation_manager() {
        let mut manager = make_manager();
        let territory = manager.create_territory(0.0, 0.0);
        manager.liberate_territory(territory, None);
        let timer = manager.get_territory(territory).map_or(0.0, Territory::liberation_timer);
        assert!((180.0..=300.0).contains(&timer));
        manager.update(301.0);
        assert!(!manager.is_territory_liberated(territory));
        assert_eq!(manager.queen_for_territory(territory).map(Queen::generation), Some(1));
    }

    #[test]
    fn parasite_count_follows_controlled_set() {
        let mut manager = make_manager();
        let queen_id = make_active_queen(&mut manager);
        let p = ParasiteId::new();
        assert!(manager.assign_parasite(queen_id, p));
        assert!(manager.assign_parasite(queen_id, ParasiteId::new()));
        let count = |m: &TerritoryManager| {
            m.get_territory(TerritoryId::new(0, 0))
                .map_or(0, Territory::parasite_count)
        };
        assert_eq!(count(&manager), 2);
        assert!(manager.release_parasite(queen_id, p));
        assert_eq!(count(&manager), 1);
        assert_eq!(manager.controllers_of(p), Vec::<QueenId>::new());
    }

    #[test]
    fn reconcile_restores_parasite_counts() {
        let mut manager = make_manager();
        let queen_id = make_active_queen(&mut manager);
        if let Some(q) = manager.queen_mut(queen_id) {
            q.apply_override(QueenOverride {
                controlled: Some(vec![ParasiteId::new(), ParasiteId::new(), ParasiteId::new()]),
                ..QueenOverride::default()
            });
        }
        assert_eq!(manager.reconcile_parasite_counts(), 1);
        assert_eq!(
            manager.get_territory(TerritoryId::new(0, 0)).map(Territory::parasite_count),
            Some(3)
        );
        assert_eq!(manager.reconcile_parasite_counts(), 0);
    }

    #[test]
    fn throttled_updates_keep_timers_correct() {
        let mut manager = make_manager();
        let territory = manager.create_territory(0.0, 0.0);
        let queen_id = manager.create_queen_for_territory(territory, 1).unwrap_or_default();
        manager.report_frame_time(80.0);
        assert_eq!(manager.update_interval(), 4);

        for _ in 0..3 {
            manager.update(10.0);
        }
        let progress = manager.queen(queen_id).map_or(1.0, Queen::growth_progress);
        assert!(progress.abs() < f32::EPSILON);

        manager.update(10.0);
        let elapsed = manager
            .queen(queen_id)
            .map_or(0.0, |q| q.growth_duration() - q.growth_time_remaining());
        assert!((elapsed - 40.0).abs() < 1e-3);
    }

    #[test]
    fn observers_see_lifecycle_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut manager = make_manager();
        manager.subscribe(Box::new(Recorder(Rc::clone(&seen))));
        make_active_queen(&mut manager);

        let seen = seen.borrow();
        let kinds: Vec<&str> = seen
            .iter()
            .map(|e| match e {
                TerritoryEvent::TerritoryCreated { .. } => "created",
                TerritoryEvent::QueenSpawned { .. } => "spawned",
                TerritoryEvent::QueenPhaseChanged { .. } => "phase",
                TerritoryEvent::HiveConstructionStarted { .. } => "hive_started",
                TerritoryEvent::HiveConstructed { .. } => "hive_built",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["created", "spawned", "phase", "hive_started", "hive_built", "phase"]
        );
    }

    #[test]
    fn missing_hive_is_rebuilt_on_request() {
        let mut manager = make_manager();
        let queen_id = make_active_queen(&mut manager);
        let lost = manager
            .queen(queen_id)
            .and_then(|q| q.hive_id().cloned())
            .unwrap_or_else(|| HiveId(String::new()));
        if let Some(q) = manager.queen_mut(queen_id) {
            q.apply_override(QueenOverride {
                hive_id: Some(None),
                ..QueenOverride::default()
            });
        }
        let hive = manager.start_hive_construction(queen_id);
        assert!(hive.is_ok());
        assert!(manager.hive(&lost).is_none());
        assert_eq!(manager.all_hives().count(), 1);
        assert_eq!(
            manager.queen(queen_id).map(Queen::phase),
            Some(QueenPhase::HiveConstruction)
        );
        assert_eq!(manager.damage_hive(&lost, 1000.0), DamageOutcome::Ignored);
        manager.update(15.0);
        assert_eq!(
            manager.queen(queen_id).map(Queen::phase),
            Some(QueenPhase::ActiveControl)
        );
        assert_eq!(
            manager.queen(queen_id).and_then(Queen::hive_id),
            hive.ok().as_ref()
        );
    }

    #[test]
    fn destroying_a_hive_the_queen_left_spares_her() {
        let mut manager = make_manager();
        let queen_id = make_active_queen(&mut manager);
        let current = manager
            .queen(queen_id)
            .and_then(|q| q.hive_id().cloned())
            .unwrap_or_else(|| HiveId(String::new()));
        let mut leftover = Hive::new(HiveSpawn {
            id: HiveId(String::from("hive_leftover")),
            queen_id,
            territory_id: TerritoryId::new(0, 0),
            position: Position::ground(512.0, 512.0),
            health: 20.0,
            construction_duration: 10.0,
            target_swarm_size: 50,
        });
        leftover.force_construction_complete();
        manager.hives.insert(leftover.id().clone(), leftover);

        let outcome = manager.damage_hive(&HiveId(String::from("hive_leftover")), 1000.0);
        assert_eq!(outcome, DamageOutcome::Destroyed);
        let queen = manager.queen(queen_id);
        assert!(queen.is_some_and(|q| !q.is_destroyed()));
        assert_eq!(queen.map(Queen::phase), Some(QueenPhase::ActiveControl));
        assert_eq!(queen.and_then(Queen::hive_id), Some(&current));
        assert!(manager.hive(&current).is_some());
        assert!(!manager.is_territory_liberated(TerritoryId::new(0, 0)));
    }

    #[test]
    fn dispose_clears_everything() {
        let mut manager = make_manager();
        make_active_queen(&mut manager);
        manager.dispose();
        assert!(manager.is_disposed());
        assert_eq!(manager.all_territories().count(), 0);
        assert_eq!(manager.all_queens().count(), 0);
        manager.update(1.0);
        assert!(manager.drain_events().is_empty());
    }
}
