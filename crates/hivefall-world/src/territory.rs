//! The territory record.
//!
//! A [`Territory`] owns its geometry and control bookkeeping. It refers to
//! its queen and hive by id only; the records themselves live in the
//! registries of the territory manager.

use hivefall_types::{ControlStatus, HiveId, Position, QueenId, TerritoryId, TerritorySnapshot};

use crate::grid::{ChunkBounds, TerritoryGrid};

/// A single 1024 x 1024 territory cell and its control state.
#[derive(Debug, Clone, PartialEq)]
pub struct Territory {
    id: TerritoryId,
    center: Position,
    bounds: ChunkBounds,
    control_status: ControlStatus,
    liberation_timer: f32,
    parasite_count: u32,
    queen_id: Option<QueenId>,
    hive_id: Option<HiveId>,
}

impl Territory {
    /// Create a contested territory for `id`, centred on its grid cell.
    pub fn new(id: TerritoryId, grid: &TerritoryGrid) -> Self {
        let center = grid.territory_center(id);
        Self::with_center(id, center, grid)
    }

    /// Create a contested territory with an explicit centre.
    ///
    /// The centre is not snapped to the grid, so bounds computed from an
    /// off-grid centre can straddle neighbouring cells. This is how drifted
    /// or hand-placed territories enter the store.
    pub fn with_center(id: TerritoryId, center: Position, grid: &TerritoryGrid) -> Self {
        let bounds = grid.chunk_bounds(center.x, center.z);
        Self {
            id,
            center,
            bounds,
            control_status: ControlStatus::Contested,
            liberation_timer: 0.0,
            parasite_count: 0,
            queen_id: None,
            hive_id: None,
        }
    }

    /// Territory id.
    pub const fn id(&self) -> TerritoryId {
        self.id
    }

    /// Centre position.
    pub const fn center(&self) -> Position {
        self.center
    }

    /// Chunk-aligned bounds.
    pub const fn bounds(&self) -> &ChunkBounds {
        &self.bounds
    }

    /// Current control status.
    pub const fn control_status(&self) -> ControlStatus {
        self.control_status
    }

    /// Seconds left in the liberation window.
    pub const fn liberation_timer(&self) -> f32 {
        self.liberation_timer
    }

    /// Parasites under the controlling queen.
    pub const fn parasite_count(&self) -> u32 {
        self.parasite_count
    }

    /// Controlling queen.
    pub const fn queen_id(&self) -> Option<QueenId> {
        self.queen_id
    }

    /// The queen's hive.
    pub const fn hive_id(&self) -> Option<&HiveId> {
        self.hive_id.as_ref()
    }

    /// Set the control status.
    pub const fn set_control_status(&mut self, status: ControlStatus) {
        self.control_status = status;
    }

    /// Set the liberation countdown.
    pub const fn set_liberation_timer(&mut self, seconds: f32) {
        self.liberation_timer = seconds;
    }

    /// Set the controlled-parasite count.
    pub const fn set_parasite_count(&mut self, count: u32) {
        self.parasite_count = count;
    }

    /// Hand the territory to `queen`.
    pub const fn assign_queen(&mut self, queen: QueenId) {
        self.queen_id = Some(queen);
        self.control_status = ControlStatus::QueenControlled;
    }

    /// Record (or clear) the hive reference.
    pub fn set_hive(&mut self, hive: Option<HiveId>) {
        self.hive_id = hive;
    }

    /// Drop the queen and hive references and zero the parasite count.
    pub fn clear_control(&mut self) {
        self.queen_id = None;
        self.hive_id = None;
        self.parasite_count = 0;
    }

    /// Move the centre and recompute bounds from it.
    pub fn relocate(&mut self, center: Position, grid: &TerritoryGrid) {
        self.center = center;
        self.bounds = grid.chunk_bounds(center.x, center.z);
    }

    /// Whether a world point falls inside the stored bounds.
    pub fn contains_point(&self, x: f32, z: f32) -> bool {
        self.bounds.rect.contains(x, z)
    }

    /// Read-only view for the UI layer.
    pub fn snapshot(&self) -> TerritorySnapshot {
        TerritorySnapshot {
            territory_id: self.id.to_string(),
            center: self.center,
            bounds: self.bounds.rect,
            chunk_count: u32::try_from(self.bounds.chunks.len()).unwrap_or(u32::MAX),
            control_status: self.control_status,
            liberation_timer: self.liberation_timer,
            parasite_count: self.parasite_count,
            queen_id: self.queen_id,
            hive_id: self.hive_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_territory_is_contested_and_empty() {
        let grid = TerritoryGrid::new();
        let t = Territory::new(TerritoryId::new(2, -1), &grid);
        assert_eq!(t.control_status(), ControlStatus::Contested);
        assert!(t.queen_id().is_none());
        assert!(t.hive_id().is_none());
        assert_eq!(t.parasite_count(), 0);
        assert!(t.contains_point(2048.0, -1024.0));
        assert!(!t.contains_point(2048.0, 0.0));
    }

    #[test]
    fn assign_and_clear_control() {
        let grid = TerritoryGrid::new();
        let mut t = Territory::new(TerritoryId::new(0, 0), &grid);
        let queen = QueenId::new();
        t.assign_queen(queen);
        t.set_parasite_count(4);
        assert_eq!(t.control_status(), ControlStatus::QueenControlled);
        assert_eq!(t.queen_id(), Some(queen));

        t.clear_control();
        assert!(t.queen_id().is_none());
        assert_eq!(t.parasite_count(), 0);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let grid = TerritoryGrid::new();
        let t = Territory::new(TerritoryId::new(1, 1), &grid);
        let snap = t.snapshot();
        assert_eq!(snap.territory_id, "territory_1_1");
        assert_eq!(snap.chunk_count, 256);
        let json = serde_json::to_string(&snap);
        assert!(json.is_ok());
    }
}
