//! Drift records tracked by the error-recovery manager.
//!
//! Each record is keyed by a deterministic dedup key so the same drift is
//! never tracked twice. A record carries when it was first detected and
//! how many correction attempts it has used.

use std::fmt;

use hivefall_types::{HiveId, ParasiteId, QueenId, TerritoryId};

/// Two territories whose bounds intersect.
#[derive(Debug, Clone, PartialEq)]
pub struct TerritoryOverlapError {
    /// Lower territory id.
    pub first: TerritoryId,
    /// Higher territory id.
    pub second: TerritoryId,
    /// Intersection area at detection time.
    pub area: f32,
    /// Detection time in milliseconds.
    pub detected_at_ms: u64,
    /// Correction attempts used.
    pub attempts: u32,
}

impl TerritoryOverlapError {
    /// Dedup key: `{first}_{second}`.
    pub fn key(&self) -> String {
        overlap_key(self.first, self.second)
    }
}

/// Dedup key for an overlapping pair.
pub fn overlap_key(first: TerritoryId, second: TerritoryId) -> String {
    format!("{first}_{second}")
}

/// What is wrong with a queen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueenCorruptionKind {
    /// Vulnerable while still growing underground.
    InvalidVulnerability,
    /// In active control with no hive.
    MissingHive,
    /// Growth time is up but progress never reached 1.
    StuckGrowth,
    /// Phase disagrees with her growth and hive state.
    InvalidPhase,
}

impl fmt::Display for QueenCorruptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidVulnerability => "invalid_vulnerability",
            Self::MissingHive => "missing_hive",
            Self::StuckGrowth => "stuck_growth",
            Self::InvalidPhase => "invalid_phase",
        };
        f.write_str(s)
    }
}

/// A queen in an inconsistent lifecycle state. Keyed by queen id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueenCorruptionError {
    /// The queen.
    pub queen_id: QueenId,
    /// Her territory.
    pub territory_id: TerritoryId,
    /// What is wrong.
    pub kind: QueenCorruptionKind,
    /// Detection time in milliseconds.
    pub detected_at_ms: u64,
    /// Correction attempts used.
    pub attempts: u32,
}

/// What went wrong with hive construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HiveFailureKind {
    /// Construction overran its duration by more than the grace period.
    Timeout,
    /// The queen is in construction but has no hive.
    MissingHive,
    /// Construction progress stopped advancing.
    StuckConstruction,
    /// The hive is not at its queen's hive site.
    InvalidPosition,
}

impl fmt::Display for HiveFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::MissingHive => "missing_hive",
            Self::StuckConstruction => "stuck_construction",
            Self::InvalidPosition => "invalid_position",
        };
        f.write_str(s)
    }
}

/// A hive construction failure. Keyed by hive id, or
/// `missing_hive_{queenId}` when there is no hive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiveConstructionError {
    /// The hive, if one exists.
    pub hive_id: Option<HiveId>,
    /// The queen.
    pub queen_id: QueenId,
    /// The territory.
    pub territory_id: TerritoryId,
    /// What went wrong.
    pub kind: HiveFailureKind,
    /// Detection time in milliseconds.
    pub detected_at_ms: u64,
    /// Correction attempts used.
    pub attempts: u32,
}

impl HiveConstructionError {
    /// Dedup key.
    pub fn key(&self) -> String {
        self.hive_id
            .as_ref()
            .map_or_else(|| missing_hive_key(self.queen_id), |id| id.as_str().to_owned())
    }
}

/// Dedup key for a queen that should have a hive and does not.
pub fn missing_hive_key(queen_id: QueenId) -> String {
    format!("missing_hive_{queen_id}")
}

/// What is wrong with a parasite's control relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParasiteControlKind {
    /// Controlled, but outside every territory.
    MissingTerritory,
    /// Controlled, but inside a territory that has no queen.
    OrphanedParasite,
    /// Controlled by a queen other than the territory's.
    WrongQueen,
    /// Listed by more than one queen.
    DuplicateControl,
}

impl fmt::Display for ParasiteControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingTerritory => "missing_territory",
            Self::OrphanedParasite => "orphaned_parasite",
            Self::WrongQueen => "wrong_queen",
            Self::DuplicateControl => "duplicate_control",
        };
        f.write_str(s)
    }
}

/// A parasite whose control relationship disagrees with its position.
/// Keyed by parasite id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParasiteControlError {
    /// The parasite.
    pub parasite_id: ParasiteId,
    /// What is wrong.
    pub kind: ParasiteControlKind,
    /// Territory the parasite stands in, if any.
    pub territory_id: Option<TerritoryId>,
    /// That territory's queen, if any.
    pub expected_queen: Option<QueenId>,
    /// Every queen that lists the parasite.
    pub controllers: Vec<QueenId>,
    /// Detection time in milliseconds.
    pub detected_at_ms: u64,
    /// Correction attempts used.
    pub attempts: u32,
}
