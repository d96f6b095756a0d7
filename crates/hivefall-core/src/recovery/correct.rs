//! Drift corrections.
//!
//! Corrections only use the territory manager's public repair surface.
//! Each returns whether the drift is gone afterwards; an `Err` means the
//! attempt could not run and the record stays pending.

use hivefall_colony::{ParasiteView, Queen};
use hivefall_types::{QueenPhase, TerritoryId};

use crate::recovery::RecoveryError;
use crate::recovery::detect::{self, ParasiteFinding};
use crate::recovery::records::{
    HiveConstructionError, HiveFailureKind, ParasiteControlKind, QueenCorruptionError,
    QueenCorruptionKind, TerritoryOverlapError,
};
use crate::territory_manager::TerritoryManager;

/// Whether a correction attempt cleared the drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionOutcome {
    /// The drift is gone.
    Resolved,
    /// The drift is still present.
    Pending,
}

impl CorrectionOutcome {
    const fn from_resolved(resolved: bool) -> Self {
        if resolved { Self::Resolved } else { Self::Pending }
    }
}

/// Whether two territories' bounds still intersect. A missing territory
/// cannot overlap anything.
pub fn still_overlapping(manager: &TerritoryManager, a: TerritoryId, b: TerritoryId) -> bool {
    match (manager.get_territory(a), manager.get_territory(b)) {
        (Some(a), Some(b)) => a.bounds().overlap_area(b.bounds()) > 0.0,
        _ => false,
    }
}

/// Snap both territories back onto their grid cells and recompute bounds.
pub fn correct_overlap(
    manager: &mut TerritoryManager,
    record: &TerritoryOverlapError,
) -> CorrectionOutcome {
    manager.realign_territory(record.first);
    manager.realign_territory(record.second);
    CorrectionOutcome::from_resolved(!still_overlapping(manager, record.first, record.second))
}

/// Repair a corrupted queen according to the kind of corruption.
///
/// A queen that no longer exists counts as resolved.
pub fn correct_queen(
    manager: &mut TerritoryManager,
    record: &QueenCorruptionError,
) -> Result<CorrectionOutcome, RecoveryError> {
    let Some(queen) = manager.queen(record.queen_id) else {
        return Ok(CorrectionOutcome::Resolved);
    };
    let expected = detect::expected_phase(queen, manager);

    match record.kind {
        QueenCorruptionKind::InvalidVulnerability => {
            if let Some(queen) = manager.queen_mut(record.queen_id) {
                queen.force_underground();
            }
        }
        QueenCorruptionKind::MissingHive => {
            manager.start_hive_construction(record.queen_id)?;
        }
        QueenCorruptionKind::StuckGrowth => {
            manager.force_growth_complete(record.queen_id)?;
        }
        QueenCorruptionKind::InvalidPhase => {
            manager.force_queen_phase(record.queen_id, expected)?;
        }
    }

    let resolved = manager
        .queen(record.queen_id)
        .is_none_or(|q| !detect::queen_still_corrupt(q, record.kind, manager));
    Ok(CorrectionOutcome::from_resolved(resolved))
}

/// Repair a hive construction failure according to its kind.
///
/// For a missing hive the territories are scanned in id order and the
/// first queen in construction without a hive gets one, which is not
/// necessarily the queen the record names.
pub fn correct_hive(
    manager: &mut TerritoryManager,
    record: &HiveConstructionError,
) -> Result<CorrectionOutcome, RecoveryError> {
    match record.kind {
        HiveFailureKind::Timeout | HiveFailureKind::StuckConstruction => {
            let Some(hive_id) = record.hive_id.as_ref().filter(|id| manager.hive(id).is_some())
            else {
                return Ok(CorrectionOutcome::Resolved);
            };
            manager.force_hive_completion(hive_id)?;
        }
        HiveFailureKind::InvalidPosition => {
            let Some(hive_id) = record.hive_id.as_ref().filter(|id| manager.hive(id).is_some())
            else {
                return Ok(CorrectionOutcome::Resolved);
            };
            manager.reseat_hive(hive_id)?;
        }
        HiveFailureKind::MissingHive => {
            let target = manager.all_territories().find_map(|t| {
                manager
                    .queen_for_territory(t.id())
                    .filter(|q| detect::queen_missing_hive(q, manager))
                    .map(Queen::id)
            });
            if let Some(queen_id) = target {
                manager.start_hive_construction(queen_id)?;
            }
        }
    }

    let hive = record.hive_id.as_ref().and_then(|id| manager.hive(id));
    let persists = detect::hive_failure_persists(record.kind, hive, record.queen_id, manager);
    Ok(CorrectionOutcome::from_resolved(!persists))
}

/// Repair a parasite's control relationship.
///
/// The parasite is released from every queen that should not hold it, and
/// handed to its territory's queen when that queen exists and can take it.
pub fn correct_parasite(
    manager: &mut TerritoryManager,
    parasite: &ParasiteView,
    finding: &ParasiteFinding,
) -> CorrectionOutcome {
    let keep = match finding.kind {
        ParasiteControlKind::MissingTerritory | ParasiteControlKind::OrphanedParasite => None,
        ParasiteControlKind::WrongQueen | ParasiteControlKind::DuplicateControl => {
            finding.expected_queen
        }
    };
    for queen_id in &finding.controllers {
        if Some(*queen_id) != keep {
            manager.release_parasite(*queen_id, parasite.id);
        }
    }
    if let Some(queen_id) = keep {
        let active = manager
            .queen(queen_id)
            .is_some_and(|q| q.phase() == QueenPhase::ActiveControl);
        if active && !finding.controllers.contains(&queen_id) {
            manager.assign_parasite(queen_id, parasite.id);
        }
    }
    CorrectionOutcome::from_resolved(detect::parasite_control(parasite, manager).is_none())
}
