//! Territory observer that turns lifecycle events into log lines and
//! running counters.

use std::cell::RefCell;
use std::rc::Rc;

use hivefall_colony::LiberationEvent;
use hivefall_core::events::{TerritoryEvent, TerritoryObserver};
use tracing::{debug, info};

/// Event totals since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    /// Queens spawned, respawns included.
    pub queens_spawned: u64,
    /// Queens destroyed.
    pub queens_destroyed: u64,
    /// Hives completed.
    pub hives_constructed: u64,
    /// Hives destroyed.
    pub hives_destroyed: u64,
    /// Territories liberated.
    pub liberations: u64,
}

/// Logs every territory event and keeps shared [`EventCounts`].
pub struct EventLog {
    counts: Rc<RefCell<EventCounts>>,
}

impl EventLog {
    /// An observer writing into `counts`.
    pub const fn new(counts: Rc<RefCell<EventCounts>>) -> Self {
        Self { counts }
    }
}

impl TerritoryObserver for EventLog {
    fn on_territory_event(&mut self, event: &TerritoryEvent) {
        let mut counts = self.counts.borrow_mut();
        match event {
            TerritoryEvent::TerritoryCreated { territory_id } => {
                debug!(territory_id = %territory_id, "Territory created");
            }
            TerritoryEvent::QueenSpawned {
                queen_id,
                territory_id,
                generation,
            } => {
                counts.queens_spawned = counts.queens_spawned.saturating_add(1);
                info!(
                    queen_id = %queen_id,
                    territory_id = %territory_id,
                    generation,
                    "Queen spawned"
                );
            }
            TerritoryEvent::QueenPhaseChanged {
                queen_id, from, to, ..
            } => {
                debug!(queen_id = %queen_id, from = %from, to = %to, "Queen phase changed");
            }
            TerritoryEvent::HiveConstructionStarted { hive_id, .. } => {
                debug!(hive_id = %hive_id, "Hive construction started");
            }
            TerritoryEvent::HiveConstructed {
                hive_id, defenders, ..
            } => {
                counts.hives_constructed = counts.hives_constructed.saturating_add(1);
                info!(hive_id = %hive_id, defenders, "Hive constructed");
            }
            TerritoryEvent::HiveDestroyed { hive_id, .. } => {
                counts.hives_destroyed = counts.hives_destroyed.saturating_add(1);
                info!(hive_id = %hive_id, "Hive destroyed");
            }
            TerritoryEvent::QueenDestroyed {
                queen_id,
                territory_id,
                generation,
            } => {
                counts.queens_destroyed = counts.queens_destroyed.saturating_add(1);
                info!(
                    queen_id = %queen_id,
                    territory_id = %territory_id,
                    generation,
                    "Queen destroyed"
                );
            }
            TerritoryEvent::TerritoryLiberated {
                territory_id,
                duration,
                ..
            } => {
                counts.liberations = counts.liberations.saturating_add(1);
                info!(territory_id = %territory_id, duration, "Territory liberated");
            }
            TerritoryEvent::TerritoryContested { territory_id } => {
                info!(territory_id = %territory_id, "Territory contested");
            }
            TerritoryEvent::Liberation(LiberationEvent::EnergyRewarded {
                territory_id,
                amount,
            }) => {
                debug!(territory_id = %territory_id, amount, "Liberation energy rewarded");
            }
            TerritoryEvent::Liberation(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use hivefall_types::{QueenId, TerritoryId};

    use super::*;

    #[test]
    fn counts_lifecycle_events() {
        let counts = Rc::new(RefCell::new(EventCounts::default()));
        let mut log = EventLog::new(Rc::clone(&counts));
        let territory_id = TerritoryId::new(0, 0);
        log.on_territory_event(&TerritoryEvent::QueenSpawned {
            queen_id: QueenId::new(),
            territory_id,
            generation: 1,
        });
        log.on_territory_event(&TerritoryEvent::TerritoryLiberated {
            territory_id,
            queen_id: None,
            duration: 200.0,
        });
        log.on_territory_event(&TerritoryEvent::TerritoryContested { territory_id });

        let counts = *counts.borrow();
        assert_eq!(counts.queens_spawned, 1);
        assert_eq!(counts.liberations, 1);
        assert_eq!(counts.queens_destroyed, 0);
    }
}
