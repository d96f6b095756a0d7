//! Liberation windows.
//!
//! When a queen dies her territory is liberated for 180 to 300 seconds. The
//! player is credited a one-time energy reward when the window opens, and
//! mining inside the territory is faster while it lasts. When the window
//! closes the territory manager respawns a queen.

use std::collections::BTreeMap;

use hivefall_types::{LiberationReason, Position, QueenId, TerritoryId};
use hivefall_world::TerritoryLookup;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::collaborators::EnergySystem;
use crate::config::LiberationConfig;
use crate::events::LiberationEvent;

/// An open liberation window.
#[derive(Debug, Clone, PartialEq)]
pub struct LiberationStatus {
    /// The liberated territory.
    pub territory_id: TerritoryId,
    /// The queen whose death opened the window, if known.
    pub queen_id: Option<QueenId>,
    /// Why the window opened.
    pub reason: LiberationReason,
    /// Window length in seconds.
    pub duration: f32,
    /// Seconds left.
    pub time_remaining: f32,
    /// Energy credited when the window opened.
    pub energy_reward: f32,
    /// Mining-speed bonus while the window lasts.
    pub mining_bonus: f32,
    /// Manager time (seconds) at which the window opened.
    pub started_at: f64,
}

/// One entry in the liberation history.
#[derive(Debug, Clone, PartialEq)]
pub struct LiberationRecord {
    /// The liberated territory.
    pub territory_id: TerritoryId,
    /// The queen, if known.
    pub queen_id: Option<QueenId>,
    /// Why the window opened.
    pub reason: LiberationReason,
    /// Window length in seconds.
    pub duration: f32,
    /// Energy credited.
    pub energy_reward: f32,
    /// Manager time (seconds) at which the window opened.
    pub started_at: f64,
}

/// Aggregates over the liberation history. Derived on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LiberationStats {
    /// Windows currently open.
    pub active: usize,
    /// Windows recorded in the history.
    pub total_liberations: usize,
    /// Sum of all energy rewards.
    pub total_energy_reward: f32,
    /// Mean energy reward (0 with no history).
    pub average_reward: f32,
    /// Mean window length in seconds (0 with no history).
    pub average_duration: f32,
}

/// Receives liberation events as they happen.
pub trait LiberationObserver {
    /// Called once per event, in emission order.
    fn on_liberation_event(&mut self, event: &LiberationEvent);
}

/// Owns every open liberation window and the liberation history.
pub struct LiberationManager {
    config: LiberationConfig,
    energy: Option<Box<dyn EnergySystem>>,
    active: BTreeMap<TerritoryId, LiberationStatus>,
    history: Vec<LiberationRecord>,
    observers: Vec<Box<dyn LiberationObserver>>,
    rng: SmallRng,
    elapsed: f64,
}

impl std::fmt::Debug for LiberationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiberationManager")
            .field("active", &self.active.len())
            .field("history", &self.history.len())
            .field("observers", &self.observers.len())
            .field("has_energy", &self.energy.is_some())
            .finish_non_exhaustive()
    }
}

impl LiberationManager {
    /// Create a manager whose random draws are seeded with `seed`.
    pub fn new(config: LiberationConfig, seed: u64) -> Self {
        Self {
            config,
            energy: None,
            active: BTreeMap::new(),
            history: Vec::new(),
            observers: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
            elapsed: 0.0,
        }
    }

    /// Attach the energy system that receives liberation rewards.
    #[must_use]
    pub fn with_energy(mut self, energy: Box<dyn EnergySystem>) -> Self {
        self.energy = Some(energy);
        self
    }

    /// Register an observer for start, end and reward events.
    pub fn subscribe(&mut self, observer: Box<dyn LiberationObserver>) {
        self.observers.push(observer);
    }

    /// The configuration in use.
    pub const fn config(&self) -> &LiberationConfig {
        &self.config
    }

    /// Open (or restart) a liberation window for `territory_id`.
    ///
    /// Duration and reward are drawn uniformly from the configured ranges.
    /// The reward is credited immediately. An existing window for the same
    /// territory is replaced, not extended.
    pub fn start_liberation(
        &mut self,
        territory_id: TerritoryId,
        queen_id: Option<QueenId>,
        reason: LiberationReason,
    ) -> Vec<LiberationEvent> {
        let (dur_lo, dur_hi) = self.config.duration_range();
        let (reward_lo, reward_hi) = self.config.reward_range();
        let duration = self.rng.random_range(dur_lo..=dur_hi);
        let energy_reward = self.rng.random_range(reward_lo..=reward_hi);

        let status = LiberationStatus {
            territory_id,
            queen_id,
            reason,
            duration,
            time_remaining: duration,
            energy_reward,
            mining_bonus: self.config.mining_bonus,
            started_at: self.elapsed,
        };
        if self.active.insert(territory_id, status).is_some() {
            debug!(territory_id = %territory_id, "Liberation restarted");
        }

        if let Some(energy) = self.energy.as_mut() {
            energy.credit_energy(energy_reward);
        }
        self.history.push(LiberationRecord {
            territory_id,
            queen_id,
            reason,
            duration,
            energy_reward,
            started_at: self.elapsed,
        });
        info!(
            territory_id = %territory_id,
            %reason,
            duration,
            energy_reward,
            "Liberation started"
        );

        let events = vec![
            LiberationEvent::Started {
                territory_id,
                queen_id,
                reason,
                duration,
            },
            LiberationEvent::EnergyRewarded {
                territory_id,
                amount: energy_reward,
            },
        ];
        self.notify(&events);
        events
    }

    /// Count every open window down by `dt` seconds and close the ones
    /// that reach zero.
    pub fn update_liberations(&mut self, dt: f32) -> Vec<LiberationEvent> {
        let dt = dt.max(0.0);
        self.elapsed += f64::from(dt);

        let mut expired = Vec::new();
        for (id, status) in &mut self.active {
            status.time_remaining -= dt;
            if status.time_remaining <= 0.0 {
                expired.push(*id);
            }
        }

        let mut events = Vec::with_capacity(expired.len());
        for territory_id in expired {
            self.active.remove(&territory_id);
            info!(territory_id = %territory_id, "Liberation ended");
            events.push(LiberationEvent::Ended {
                territory_id,
                forced: false,
            });
        }
        self.notify(&events);
        events
    }

    /// The open window for `territory_id`, if any.
    pub fn get_liberation_status(&self, territory_id: TerritoryId) -> Option<&LiberationStatus> {
        self.active.get(&territory_id)
    }

    /// Whether `territory_id` has an open window.
    pub fn is_liberated(&self, territory_id: TerritoryId) -> bool {
        self.active.contains_key(&territory_id)
    }

    /// Every open window, in territory order.
    pub fn active_liberations(&self) -> impl Iterator<Item = &LiberationStatus> {
        self.active.values()
    }

    /// Mining bonus at `position`: the configured bonus inside a liberated
    /// territory, zero elsewhere or without a lookup.
    pub fn mining_bonus_at(
        &self,
        position: &Position,
        lookup: Option<&dyn TerritoryLookup>,
    ) -> f32 {
        lookup
            .and_then(|l| l.territory_id_at(position))
            .and_then(|id| self.active.get(&id))
            .map_or(0.0, |status| status.mining_bonus)
    }

    /// Close the window for `territory_id` now.
    pub fn force_end_liberation(&mut self, territory_id: TerritoryId) -> Vec<LiberationEvent> {
        if self.active.remove(&territory_id).is_none() {
            return Vec::new();
        }
        info!(territory_id = %territory_id, "Liberation force-ended");
        let events = vec![LiberationEvent::Ended {
            territory_id,
            forced: true,
        }];
        self.notify(&events);
        events
    }

    /// Every recorded liberation, oldest first.
    pub fn history(&self) -> &[LiberationRecord] {
        &self.history
    }

    /// Drop the oldest history entries beyond the configured limit.
    ///
    /// Returns how many were dropped.
    pub fn trim_history(&mut self) -> usize {
        let excess = self.history.len().saturating_sub(self.config.history_limit);
        if excess > 0 {
            self.history.drain(..excess);
        }
        excess
    }

    /// Aggregates over the history.
    pub fn liberation_stats(&self) -> LiberationStats {
        let total = self.history.len();
        let total_reward: f32 = self.history.iter().map(|r| r.energy_reward).sum();
        let total_duration: f32 = self.history.iter().map(|r| r.duration).sum();
        let (average_reward, average_duration) = if total == 0 {
            (0.0, 0.0)
        } else {
            #[allow(clippy::cast_precision_loss)]
            let n = total as f32;
            (total_reward / n, total_duration / n)
        };
        LiberationStats {
            active: self.active.len(),
            total_liberations: total,
            total_energy_reward: total_reward,
            average_reward,
            average_duration,
        }
    }

    /// The attached energy system, if any.
    pub fn energy(&self) -> Option<&dyn EnergySystem> {
        self.energy.as_deref()
    }

    /// Drop every window, the history and all observers.
    pub fn dispose(&mut self) {
        self.active.clear();
        self.history.clear();
        self.observers.clear();
        self.energy = None;
    }

    fn notify(&mut self, events: &[LiberationEvent]) {
        for event in events {
            for observer in &mut self.observers {
                observer.on_liberation_event(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Pool(f32);

    impl EnergySystem for Pool {
        fn credit_energy(&mut self, amount: f32) {
            self.0 += amount;
        }

        fn consume_energy(&mut self, amount: f32) -> bool {
            self.0 -= amount;
            true
        }

        fn total_energy(&self) -> f32 {
            self.0
        }
    }

    struct Recorder(Rc<RefCell<Vec<LiberationEvent>>>);

    impl LiberationObserver for Recorder {
        fn on_liberation_event(&mut self, event: &LiberationEvent) {
            self.0.borrow_mut().push(event.clone());
        }
    }

    struct OnlyOrigin;

    impl TerritoryLookup for OnlyOrigin {
        fn territory_id_at(&self, position: &Position) -> Option<TerritoryId> {
            (position.x >= 0.0 && position.x < 1024.0 && position.z >= 0.0 && position.z < 1024.0)
                .then_some(TerritoryId::new(0, 0))
        }
    }

    fn fixed_config(duration: f32) -> LiberationConfig {
        LiberationConfig {
            duration_min_secs: duration,
            duration_max_secs: duration,
            ..LiberationConfig::default()
        }
    }

    #[test]
    fn draws_stay_in_range() {
        let mut manager = LiberationManager::new(LiberationConfig::default(), 3);
        for x in 0..100 {
            manager.start_liberation(TerritoryId::new(x, 0), None, LiberationReason::Manual);
        }
        for status in manager.active_liberations() {
            assert!((180.0..=300.0).contains(&status.duration));
            assert!((50.0..=100.0).contains(&status.energy_reward));
        }
        assert_eq!(manager.liberation_stats().total_liberations, 100);
    }

    #[test]
    fn reward_is_credited_on_start() {
        let pool = Rc::new(RefCell::new(Pool::default()));
        let mut manager = LiberationManager::new(LiberationConfig::default(), 1)
            .with_energy(Box::new(Rc::clone(&pool)));
        manager.start_liberation(TerritoryId::new(0, 0), None, LiberationReason::QueenDestroyed);
        let reward = manager
            .get_liberation_status(TerritoryId::new(0, 0))
            .map_or(0.0, |s| s.energy_reward);
        assert!(reward >= 50.0);
        assert!((pool.borrow().total_energy() - reward).abs() < f32::EPSILON);
    }

    #[test]
    fn restart_overwrites_instead_of_extending() {
        let mut manager = LiberationManager::new(fixed_config(200.0), 1);
        let id = TerritoryId::new(0, 0);
        manager.start_liberation(id, None, LiberationReason::Manual);
        manager.update_liberations(150.0);
        manager.start_liberation(id, None, LiberationReason::Manual);
        let remaining = manager.get_liberation_status(id).map_or(0.0, |s| s.time_remaining);
        assert!((remaining - 200.0).abs() < f32::EPSILON);
        assert_eq!(manager.active_liberations().count(), 1);
        assert_eq!(manager.history().len(), 2);
    }

    #[test]
    fn window_expires_and_notifies() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut manager = LiberationManager::new(fixed_config(180.0), 1);
        manager.subscribe(Box::new(Recorder(Rc::clone(&seen))));
        let id = TerritoryId::new(2, 3);
        manager.start_liberation(id, None, LiberationReason::Manual);

        assert!(manager.update_liberations(179.0).is_empty());
        assert!(manager.is_liberated(id));
        let events = manager.update_liberations(1.5);
        assert_eq!(
            events,
            vec![LiberationEvent::Ended {
                territory_id: id,
                forced: false
            }]
        );
        assert!(!manager.is_liberated(id));
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn mining_bonus_needs_lookup_and_liberation() {
        let mut manager = LiberationManager::new(LiberationConfig::default(), 1);
        let inside = Position::ground(10.0, 10.0);
        let outside = Position::ground(-10.0, 10.0);
        assert!(manager.mining_bonus_at(&inside, Some(&OnlyOrigin)).abs() < f32::EPSILON);

        manager.start_liberation(TerritoryId::new(0, 0), None, LiberationReason::Manual);
        assert!((manager.mining_bonus_at(&inside, Some(&OnlyOrigin)) - 0.25).abs() < f32::EPSILON);
        assert!(manager.mining_bonus_at(&outside, Some(&OnlyOrigin)).abs() < f32::EPSILON);
        assert!(manager.mining_bonus_at(&inside, None).abs() < f32::EPSILON);
    }

    #[test]
    fn force_end_only_reports_open_windows() {
        let mut manager = LiberationManager::new(LiberationConfig::default(), 1);
        let id = TerritoryId::new(0, 0);
        assert!(manager.force_end_liberation(id).is_empty());
        manager.start_liberation(id, None, LiberationReason::Manual);
        assert_eq!(manager.force_end_liberation(id).len(), 1);
        assert!(!manager.is_liberated(id));
    }

    #[test]
    fn stats_are_derived_from_history() {
        let mut manager = LiberationManager::new(fixed_config(200.0), 1);
        assert_eq!(manager.liberation_stats(), LiberationStats::default());
        manager.start_liberation(TerritoryId::new(0, 0), None, LiberationReason::Manual);
        manager.start_liberation(TerritoryId::new(1, 0), None, LiberationReason::Manual);
        let stats = manager.liberation_stats();
        assert_eq!(stats.active, 2);
        assert!((stats.average_duration - 200.0).abs() < f32::EPSILON);
        assert!((stats.total_energy_reward - stats.average_reward * 2.0).abs() < 1e-3);
    }

    #[test]
    fn history_trims_to_limit() {
        let config = LiberationConfig {
            history_limit: 2,
            ..LiberationConfig::default()
        };
        let mut manager = LiberationManager::new(config, 1);
        for x in 0..5 {
            manager.start_liberation(TerritoryId::new(x, 0), None, LiberationReason::Manual);
        }
        assert_eq!(manager.trim_history(), 3);
        assert_eq!(manager.history().len(), 2);
        assert_eq!(
            manager.history().first().map(|r| r.territory_id),
            Some(TerritoryId::new(3, 0))
        );
    }
}
