//! The territory store: every [`Territory`] keyed by id.
//!
//! The store is built on a [`TerritoryGrid`]. Lookups by position derive
//! the id from the grid and then consult the map, so a point only resolves
//! to a territory that actually exists.

use std::collections::BTreeMap;

use hivefall_types::{Position, TerritoryId};
use tracing::debug;

use crate::error::WorldError;
use crate::grid::TerritoryGrid;
use crate::territory::Territory;

/// Resolves world positions to existing territories.
///
/// Implemented by [`TerritoryStore`]; components that only need to ask
/// "which territory is this point in?" depend on this trait rather than on
/// the store.
pub trait TerritoryLookup {
    /// Id of the existing territory containing `position`, if any.
    fn territory_id_at(&self, position: &Position) -> Option<TerritoryId>;
}

/// A pair of territories whose bounds intersect with positive area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerritoryOverlap {
    /// The lower of the two ids.
    pub first: TerritoryId,
    /// The higher of the two ids.
    pub second: TerritoryId,
    /// Intersection area in square world units.
    pub area: f32,
}

/// Owner of all territory records.
#[derive(Debug, Clone, Default)]
pub struct TerritoryStore {
    grid: TerritoryGrid,
    territories: BTreeMap<TerritoryId, Territory>,
}

impl TerritoryStore {
    /// Create an empty store over `grid`.
    pub const fn new(grid: TerritoryGrid) -> Self {
        Self {
            grid,
            territories: BTreeMap::new(),
        }
    }

    /// The grid this store is built on.
    pub const fn grid(&self) -> &TerritoryGrid {
        &self.grid
    }

    /// Number of territories.
    pub fn len(&self) -> usize {
        self.territories.len()
    }

    /// Whether the store holds no territories.
    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }

    /// Whether a territory with this id exists.
    pub fn contains(&self, id: TerritoryId) -> bool {
        self.territories.contains_key(&id)
    }

    /// Look up a territory by id.
    pub fn get(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(&id)
    }

    /// Look up a territory by id, mutably.
    pub fn get_mut(&mut self, id: TerritoryId) -> Option<&mut Territory> {
        self.territories.get_mut(&id)
    }

    /// Look up a territory by its text id. Malformed ids resolve to `None`.
    pub fn get_by_key(&self, key: &str) -> Option<&Territory> {
        key.parse::<TerritoryId>().ok().and_then(|id| self.get(id))
    }

    /// Resolve a text id to an existing territory.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::MalformedTerritoryId`] if `key` does not parse
    /// and [`WorldError::TerritoryNotFound`] if no such territory exists.
    pub fn require(&self, key: &str) -> Result<&Territory, WorldError> {
        let id: TerritoryId = key.parse()?;
        self.get(id).ok_or(WorldError::TerritoryNotFound(id))
    }

    /// The existing territory containing world point `(x, z)`.
    pub fn territory_at(&self, x: f32, z: f32) -> Option<&Territory> {
        self.get(self.grid.territory_id_at(x, z))
    }

    /// Create the territory containing `(x, z)` unless it already exists.
    ///
    /// Returns the id and whether a new territory was created.
    pub fn create_at(&mut self, x: f32, z: f32) -> (TerritoryId, bool) {
        let id = self.grid.territory_id_at(x, z);
        if self.territories.contains_key(&id) {
            return (id, false);
        }
        self.territories.insert(id, Territory::new(id, &self.grid));
        debug!(territory_id = %id, "Territory created");
        (id, true)
    }

    /// Insert a pre-built territory, replacing any record with the same id.
    pub fn insert(&mut self, territory: Territory) -> Option<Territory> {
        self.territories.insert(territory.id(), territory)
    }

    /// Remove a territory.
    pub fn remove(&mut self, id: TerritoryId) -> Option<Territory> {
        self.territories.remove(&id)
    }

    /// Remove every territory.
    pub fn clear(&mut self) {
        self.territories.clear();
    }

    /// All territories in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Territory> {
        self.territories.values()
    }

    /// All territories in id order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Territory> {
        self.territories.values_mut()
    }

    /// All ids in order.
    pub fn ids(&self) -> Vec<TerritoryId> {
        self.territories.keys().copied().collect()
    }

    /// Existing territories among the eight cells around `key`.
    ///
    /// `key` is a text id; a malformed key yields an empty list.
    pub fn neighbors(&self, key: &str) -> Vec<TerritoryId> {
        let Ok(id) = key.parse::<TerritoryId>() else {
            return Vec::new();
        };
        self.neighbors_of(id)
    }

    /// Existing territories among the eight cells around `id`.
    pub fn neighbors_of(&self, id: TerritoryId) -> Vec<TerritoryId> {
        id.surrounding()
            .into_iter()
            .filter(|n| self.territories.contains_key(n))
            .collect()
    }

    /// Snap a territory back onto its grid cell and recompute its bounds.
    ///
    /// Returns `None` if the territory does not exist, otherwise whether
    /// anything changed.
    pub fn realign(&mut self, id: TerritoryId) -> Option<bool> {
        let grid = self.grid;
        let territory = self.territories.get_mut(&id)?;
        let center = grid.territory_center(id);
        let bounds = grid.chunk_bounds(center.x, center.z);
        let changed = territory.center() != center || territory.bounds() != &bounds;
        territory.relocate(center, &grid);
        if changed {
            debug!(territory_id = %id, "Territory realigned to grid");
        }
        Some(changed)
    }

    /// Every pair of territories whose bounds intersect with positive area.
    ///
    /// Pairwise O(n^2) scan; pairs are reported once, lower id first.
    pub fn overlaps(&self) -> Vec<TerritoryOverlap> {
        let all: Vec<&Territory> = self.territories.values().collect();
        let mut out = Vec::new();
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i.saturating_add(1)) {
                let area = a.bounds().overlap_area(b.bounds());
                if area > 0.0 {
                    out.push(TerritoryOverlap {
                        first: a.id(),
                        second: b.id(),
                        area,
                    });
                }
            }
        }
        out
    }
}

impl TerritoryLookup for TerritoryStore {
    fn territory_id_at(&self, position: &Position) -> Option<TerritoryId> {
        self.territory_at(position.x, position.z).map(Territory::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(cells: &[(i32, i32)]) -> TerritoryStore {
        let mut store = TerritoryStore::new(TerritoryGrid::new());
        for &(x, z) in cells {
            let grid = *store.grid();
            store.insert(Territory::new(TerritoryId::new(x, z), &grid));
        }
        store
    }

    #[test]
    fn create_at_is_idempotent() {
        let mut store = TerritoryStore::new(TerritoryGrid::new());
        let (a, created_a) = store.create_at(100.0, 100.0);
        let (b, created_b) = store.create_at(900.0, 5.0);
        assert_eq!(a, b);
        assert!(created_a);
        assert!(!created_b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn lookup_by_position_requires_existing_territory() {
        let store = store_with(&[(0, 0)]);
        assert!(store.territory_at(10.0, 10.0).is_some());
        assert!(store.territory_at(-10.0, 10.0).is_none());
        assert_eq!(
            store.territory_id_at(&Position::ground(500.0, 500.0)),
            Some(TerritoryId::new(0, 0))
        );
    }

    #[test]
    fn neighbors_only_lists_existing_cells() {
        let store = store_with(&[(0, 0), (1, 0), (-1, -1), (5, 5)]);
        let mut n = store.neighbors("territory_0_0");
        n.sort();
        assert_eq!(n, vec![TerritoryId::new(-1, -1), TerritoryId::new(1, 0)]);
    }

    #[test]
    fn malformed_key_has_no_neighbors() {
        let store = store_with(&[(0, 0), (1, 0)]);
        assert!(store.neighbors("territory_x_0").is_empty());
        assert!(store.neighbors("garbage").is_empty());
        assert!(store.get_by_key("garbage").is_none());
    }

    #[test]
    fn require_distinguishes_malformed_from_missing() {
        let store = store_with(&[(0, 0)]);
        assert!(store.require("territory_0_0").is_ok());
        assert!(matches!(
            store.require("territory_3_3"),
            Err(WorldError::TerritoryNotFound(_))
        ));
        assert!(matches!(
            store.require("nope"),
            Err(WorldError::MalformedTerritoryId { .. })
        ));
    }

    #[test]
    fn grid_aligned_store_has_no_overlaps() {
        let store = store_with(&[(0, 0), (1, 0), (0, 1), (1, 1), (-1, 0)]);
        assert!(store.overlaps().is_empty());
    }

    #[test]
    fn drifted_center_overlaps_and_realign_fixes_it() {
        let mut store = store_with(&[(0, 0)]);
        let grid = *store.grid();
        let drifted = Territory::with_center(
            TerritoryId::new(1, 0),
            Position::ground(1024.0, 512.0),
            &grid,
        );
        store.insert(drifted);

        let overlaps = store.overlaps();
        assert_eq!(overlaps.len(), 1);
        assert!(overlaps.first().is_some_and(|o| o.area > 0.0));

        assert_eq!(store.realign(TerritoryId::new(1, 0)), Some(true));
        assert_eq!(store.realign(TerritoryId::new(0, 0)), Some(false));
        assert!(store.overlaps().is_empty());
        assert_eq!(store.realign(TerritoryId::new(9, 9)), None);
    }
}
