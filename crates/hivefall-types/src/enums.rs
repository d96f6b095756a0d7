//! Enumeration types for the territorial-control core.

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Control status
// ---------------------------------------------------------------------------

/// Who currently holds a territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ControlStatus {
    /// A live queen dominates the territory.
    QueenControlled,
    /// The queen was destroyed and the liberation window is running.
    Liberated,
    /// No queen and no liberation window; a queen is about to spawn.
    Contested,
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueenControlled => write!(f, "queen_controlled"),
            Self::Liberated => write!(f, "liberated"),
            Self::Contested => write!(f, "contested"),
        }
    }
}

// ---------------------------------------------------------------------------
// Queen phase
// ---------------------------------------------------------------------------

/// Lifecycle phase of a queen.
///
/// Phases only move forward:
/// `UndergroundGrowth -> HiveConstruction -> ActiveControl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum QueenPhase {
    /// Growing underground; invulnerable.
    UndergroundGrowth,
    /// Building the hive; invulnerable.
    HiveConstruction,
    /// Hive complete; the queen controls parasites and can be damaged.
    ActiveControl,
}

impl QueenPhase {
    /// Whether a queen in this phase can take damage.
    pub const fn is_vulnerable(self) -> bool {
        matches!(self, Self::ActiveControl)
    }
}

impl fmt::Display for QueenPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndergroundGrowth => write!(f, "UNDERGROUND_GROWTH"),
            Self::HiveConstruction => write!(f, "HIVE_CONSTRUCTION"),
            Self::ActiveControl => write!(f, "ACTIVE_CONTROL"),
        }
    }
}

// ---------------------------------------------------------------------------
// Liberation reason
// ---------------------------------------------------------------------------

/// Why a liberation window was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LiberationReason {
    /// The territory's queen was killed.
    QueenDestroyed,
    /// Liberation was requested directly (console, scripted event).
    Manual,
}

impl fmt::Display for LiberationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueenDestroyed => write!(f, "queen_destroyed"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_control_is_vulnerable() {
        assert!(!QueenPhase::UndergroundGrowth.is_vulnerable());
        assert!(!QueenPhase::HiveConstruction.is_vulnerable());
        assert!(QueenPhase::ActiveControl.is_vulnerable());
    }

    #[test]
    fn serde_names_match_display() {
        let json = serde_json::to_string(&ControlStatus::QueenControlled).ok();
        assert_eq!(json.as_deref(), Some("\"queen_controlled\""));
        let json = serde_json::to_string(&QueenPhase::HiveConstruction).ok();
        assert_eq!(json.as_deref(), Some("\"HIVE_CONSTRUCTION\""));
        assert_eq!(QueenPhase::HiveConstruction.to_string(), "HIVE_CONSTRUCTION");
    }
}
