//! Drift detectors.
//!
//! Every detector is a pure read over the territory manager. The recovery
//! manager runs them during a validation pass and again after a correction
//! to decide whether the drift is gone.

use hivefall_colony::{Hive, ParasiteView, Queen};
use hivefall_types::{QueenId, QueenPhase, TerritoryId};
use hivefall_world::TerritoryLookup;

use crate::recovery::records::{HiveFailureKind, ParasiteControlKind, QueenCorruptionKind};
use crate::territory_manager::TerritoryManager;

/// Seconds a hive may overrun its construction time before it counts as
/// timed out.
pub const HIVE_TIMEOUT_GRACE_SECS: f32 = 5.0;

/// Whether `queen`'s hive reference resolves to a registered hive.
fn has_hive(queen: &Queen, manager: &TerritoryManager) -> bool {
    queen.hive_id().is_some_and(|id| manager.hive(id).is_some())
}

/// First corruption found on `queen`, checked in order: invalid
/// vulnerability, missing hive, stuck growth.
pub fn queen_corruption(queen: &Queen, manager: &TerritoryManager) -> Option<QueenCorruptionKind> {
    if queen.is_destroyed() {
        return None;
    }
    let phase = queen.phase();
    if queen.is_vulnerable() && phase == QueenPhase::UndergroundGrowth {
        return Some(QueenCorruptionKind::InvalidVulnerability);
    }
    if phase == QueenPhase::ActiveControl && !has_hive(queen, manager) {
        return Some(QueenCorruptionKind::MissingHive);
    }
    if phase == QueenPhase::UndergroundGrowth
        && queen.growth_time_remaining() <= 0.0
        && queen.growth_progress() < 1.0
    {
        return Some(QueenCorruptionKind::StuckGrowth);
    }
    None
}

/// Whether a queen flagged with `kind` still shows it.
pub fn queen_still_corrupt(
    queen: &Queen,
    kind: QueenCorruptionKind,
    manager: &TerritoryManager,
) -> bool {
    match kind {
        QueenCorruptionKind::InvalidPhase => expected_phase(queen, manager) != queen.phase(),
        _ => queen_corruption(queen, manager).is_some(),
    }
}

/// The phase a queen's growth and hive state imply.
pub fn expected_phase(queen: &Queen, manager: &TerritoryManager) -> QueenPhase {
    match queen.hive_id().and_then(|id| manager.hive(id)) {
        Some(hive) if hive.is_constructed() => QueenPhase::ActiveControl,
        Some(_) => QueenPhase::HiveConstruction,
        None if queen.growth_progress() >= 1.0 => QueenPhase::HiveConstruction,
        None => QueenPhase::UndergroundGrowth,
    }
}

/// Whether `hive` has overrun its construction time past the grace period
/// without finishing.
pub fn hive_timed_out(hive: &Hive) -> bool {
    hive.is_active()
        && !hive.is_constructed()
        && hive.construction_progress() < 1.0
        && hive.construction_time_remaining() <= -HIVE_TIMEOUT_GRACE_SECS
}

/// Whether `queen` is in construction with no registered hive.
pub fn queen_missing_hive(queen: &Queen, manager: &TerritoryManager) -> bool {
    !queen.is_destroyed()
        && queen.phase() == QueenPhase::HiveConstruction
        && !has_hive(queen, manager)
}

/// Whether a hive failure of `kind` is still present.
pub fn hive_failure_persists(
    kind: HiveFailureKind,
    hive: Option<&Hive>,
    queen_id: QueenId,
    manager: &TerritoryManager,
) -> bool {
    match kind {
        HiveFailureKind::Timeout => hive.is_some_and(hive_timed_out),
        HiveFailureKind::StuckConstruction => {
            hive.is_some_and(|h| h.is_active() && !h.is_constructed())
        }
        HiveFailureKind::InvalidPosition => hive.is_some_and(|h| {
            manager
                .queen(h.queen_id())
                .is_some_and(|q| q.hive_site().distance_xz(&h.position()) > f32::EPSILON)
        }),
        HiveFailureKind::MissingHive => manager
            .queen(queen_id)
            .is_some_and(|q| queen_missing_hive(q, manager)),
    }
}

/// A detected parasite-control problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParasiteFinding {
    /// What is wrong.
    pub kind: ParasiteControlKind,
    /// Territory the parasite stands in.
    pub territory_id: Option<TerritoryId>,
    /// That territory's queen.
    pub expected_queen: Option<QueenId>,
    /// Queens that list the parasite.
    pub controllers: Vec<QueenId>,
}

/// Check one parasite's control relationship against its position.
///
/// Dead parasites and parasites no queen controls are never flagged.
pub fn parasite_control(
    parasite: &ParasiteView,
    manager: &TerritoryManager,
) -> Option<ParasiteFinding> {
    if !parasite.alive {
        return None;
    }
    let controllers = manager.controllers_of(parasite.id);
    if controllers.is_empty() {
        return None;
    }
    let Some(territory_id) = manager.store().territory_id_at(&parasite.position) else {
        return Some(ParasiteFinding {
            kind: ParasiteControlKind::MissingTerritory,
            territory_id: None,
            expected_queen: None,
            controllers,
        });
    };
    let expected_queen = manager
        .get_territory(territory_id)
        .and_then(|t| t.queen_id())
        .filter(|id| manager.queen(*id).is_some());

    let kind = if controllers.len() > 1 {
        ParasiteControlKind::DuplicateControl
    } else if expected_queen.is_none() {
        ParasiteControlKind::OrphanedParasite
    } else if controllers.first().copied() != expected_queen {
        ParasiteControlKind::WrongQueen
    } else {
        return None;
    };
    Some(ParasiteFinding {
        kind,
        territory_id: Some(territory_id),
        expected_queen,
        controllers,
    })
}
