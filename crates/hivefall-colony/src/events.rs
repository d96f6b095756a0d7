//! Lifecycle events returned by the queen, hive and liberation state
//! machines, and the damage outcome shared by queens and hives.

use hivefall_types::{HiveId, LiberationReason, QueenId, QueenPhase, TerritoryId};

/// Result of applying damage to a queen or hive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// The target could not be damaged (not vulnerable, not constructed, or
    /// already destroyed).
    Ignored,
    /// The target took damage and survived.
    Damaged {
        /// Health left after the hit.
        remaining: f32,
    },
    /// The hit reduced health to zero.
    Destroyed,
}

impl DamageOutcome {
    /// Whether the target was destroyed by this hit.
    pub const fn is_destroyed(self) -> bool {
        matches!(self, Self::Destroyed)
    }
}

/// Emitted by [`crate::Queen`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueenEvent {
    /// The queen moved from one phase to another.
    PhaseChanged {
        /// The queen.
        queen_id: QueenId,
        /// Her territory.
        territory_id: TerritoryId,
        /// Phase before the transition.
        from: QueenPhase,
        /// Phase after the transition.
        to: QueenPhase,
    },
}

/// Emitted by [`crate::Hive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HiveEvent {
    /// Construction finished; the hive can be damaged and its queen is
    /// exposed.
    Constructed {
        /// The hive.
        hive_id: HiveId,
        /// The owning queen.
        queen_id: QueenId,
        /// The territory.
        territory_id: TerritoryId,
    },
}

/// Emitted by [`crate::LiberationManager`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiberationEvent {
    /// A liberation window opened (or was restarted).
    Started {
        /// The liberated territory.
        territory_id: TerritoryId,
        /// The queen whose death caused it, if known.
        queen_id: Option<QueenId>,
        /// Why the window opened.
        reason: LiberationReason,
        /// Window length in seconds.
        duration: f32,
    },
    /// The one-time energy reward was credited.
    EnergyRewarded {
        /// The liberated territory.
        territory_id: TerritoryId,
        /// Energy credited.
        amount: f32,
    },
    /// A liberation window closed.
    Ended {
        /// The territory.
        territory_id: TerritoryId,
        /// Whether it was ended early with `force_end_liberation`.
        forced: bool,
    },
}
