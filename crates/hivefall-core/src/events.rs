//! Territory-level events published by the territory manager.
//!
//! Queen, hive and liberation events from the colony state machines are
//! republished here, together with the events only the manager can see
//! (territory creation, respawns, destruction cascades).

use hivefall_colony::LiberationEvent;
use hivefall_types::{HiveId, QueenId, QueenPhase, TerritoryId};

/// A change in territorial control.
#[derive(Debug, Clone, PartialEq)]
pub enum TerritoryEvent {
    /// A territory was added to the store.
    TerritoryCreated {
        /// The new territory.
        territory_id: TerritoryId,
    },
    /// A queen was spawned.
    QueenSpawned {
        /// The queen.
        queen_id: QueenId,
        /// Her territory.
        territory_id: TerritoryId,
        /// Her generation.
        generation: u32,
    },
    /// A queen changed phase.
    QueenPhaseChanged {
        /// The queen.
        queen_id: QueenId,
        /// Her territory.
        territory_id: TerritoryId,
        /// Previous phase.
        from: QueenPhase,
        /// New phase.
        to: QueenPhase,
    },
    /// Hive construction began.
    HiveConstructionStarted {
        /// The hive.
        hive_id: HiveId,
        /// Its queen.
        queen_id: QueenId,
        /// The territory.
        territory_id: TerritoryId,
    },
    /// A hive finished construction.
    HiveConstructed {
        /// The hive.
        hive_id: HiveId,
        /// Its queen.
        queen_id: QueenId,
        /// The territory.
        territory_id: TerritoryId,
        /// Defenders recorded for it.
        defenders: u32,
    },
    /// A hive was destroyed.
    HiveDestroyed {
        /// The hive.
        hive_id: HiveId,
        /// Its queen.
        queen_id: QueenId,
        /// The territory.
        territory_id: TerritoryId,
    },
    /// A queen was destroyed.
    QueenDestroyed {
        /// The queen.
        queen_id: QueenId,
        /// Her territory.
        territory_id: TerritoryId,
        /// Her generation.
        generation: u32,
    },
    /// A territory entered a liberation window.
    TerritoryLiberated {
        /// The territory.
        territory_id: TerritoryId,
        /// The queen whose death liberated it, if any.
        queen_id: Option<QueenId>,
        /// Window length in seconds.
        duration: f32,
    },
    /// A liberation window closed and the territory is up for grabs.
    TerritoryContested {
        /// The territory.
        territory_id: TerritoryId,
    },
    /// Republished liberation-manager event.
    Liberation(LiberationEvent),
}

/// Receives territory events as they happen.
pub trait TerritoryObserver {
    /// Called once per event, in emission order.
    fn on_territory_event(&mut self, event: &TerritoryEvent);
}
