//! Value types and read-only snapshots.
//!
//! Snapshots are what the rendering and UI layers receive. They are plain
//! data: building one never mutates core state, and nothing outside the
//! core writes back through them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ControlStatus, QueenPhase};
use crate::ids::{HiveId, QueenId};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A point in world space. `y` is height; territories live on the X/Z plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// World X coordinate.
    pub x: f32,
    /// Height.
    pub y: f32,
    /// World Z coordinate.
    pub z: f32,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// A position on the ground plane (`y = 0`).
    pub const fn ground(x: f32, z: f32) -> Self {
        Self { x, y: 0.0, z }
    }

    /// Horizontal distance to `other`, ignoring height.
    pub fn distance_xz(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx.hypot(dz)
    }
}

/// Integer coordinates of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChunkCoord {
    /// Chunk index along X.
    pub x: i32,
    /// Chunk index along Z.
    pub z: i32,
}

/// Axis-aligned rectangle on the X/Z plane, `[min, max)` on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BoundsRect {
    /// Inclusive lower X bound.
    pub min_x: f32,
    /// Exclusive upper X bound.
    pub max_x: f32,
    /// Inclusive lower Z bound.
    pub min_z: f32,
    /// Exclusive upper Z bound.
    pub max_z: f32,
}

impl BoundsRect {
    /// Area of the intersection with `other`; zero when the rectangles only
    /// touch or are disjoint.
    pub fn intersection_area(&self, other: &Self) -> f32 {
        let overlap_x = self.max_x.min(other.max_x) - self.min_x.max(other.min_x);
        let overlap_z = self.max_z.min(other.max_z) - self.min_z.max(other.min_z);
        if overlap_x <= 0.0 || overlap_z <= 0.0 {
            return 0.0;
        }
        overlap_x * overlap_z
    }

    /// Whether the point lies inside the rectangle.
    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_x && x < self.max_x && z >= self.min_z && z < self.max_z
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Read-only view of a territory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TerritorySnapshot {
    /// Canonical `territory_{x}_{z}` id.
    pub territory_id: String,
    /// Territory center.
    pub center: Position,
    /// Chunk-aligned bounds.
    pub bounds: BoundsRect,
    /// Number of chunks covered.
    pub chunk_count: u32,
    /// Current control status.
    pub control_status: ControlStatus,
    /// Seconds left in the liberation window (0 when not liberated).
    pub liberation_timer: f32,
    /// Parasites under the queen's control.
    pub parasite_count: u32,
    /// Controlling queen, if any.
    pub queen_id: Option<QueenId>,
    /// The queen's hive, if any.
    pub hive_id: Option<HiveId>,
}

/// Read-only view of a queen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QueenStats {
    /// Queen id.
    pub queen_id: QueenId,
    /// Owning territory id.
    pub territory_id: String,
    /// Lifecycle phase.
    pub phase: QueenPhase,
    /// Current health.
    pub health: f32,
    /// Health at spawn.
    pub max_health: f32,
    /// Growth progress in `[0, 1]`.
    pub growth_progress: f32,
    /// Seconds of growth left (may be negative when overdue).
    pub growth_time_remaining: f32,
    /// Whether the queen can currently take damage.
    pub vulnerable: bool,
    /// Respawn generation.
    pub generation: u32,
    /// Parasites under control.
    pub controlled_parasites: u32,
    /// The hive, once construction has started.
    pub hive_id: Option<HiveId>,
    /// Current position.
    pub position: Position,
}

/// Read-only view of a hive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HiveStats {
    /// Hive id.
    pub hive_id: HiveId,
    /// Owning queen.
    pub queen_id: QueenId,
    /// Owning territory id.
    pub territory_id: String,
    /// Current health.
    pub health: f32,
    /// Health at creation.
    pub max_health: f32,
    /// Construction progress in `[0, 1]`.
    pub construction_progress: f32,
    /// Whether construction has completed.
    pub constructed: bool,
    /// False once destroyed.
    pub active: bool,
    /// Defenders currently recorded (including ones not yet pruned).
    pub defenders: u32,
    /// Defenders requested at construction.
    pub target_swarm_size: u32,
    /// Position.
    pub position: Position,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(min_x: f32, max_x: f32, min_z: f32, max_z: f32) -> BoundsRect {
        BoundsRect { min_x, max_x, min_z, max_z }
    }

    #[test]
    fn touching_rectangles_do_not_intersect() {
        let a = rect(0.0, 1024.0, 0.0, 1024.0);
        let b = rect(1024.0, 2048.0, 0.0, 1024.0);
        assert!(a.intersection_area(&b) <= 0.0);
    }

    #[test]
    fn overlapping_rectangles_report_area() {
        let a = rect(0.0, 1024.0, 0.0, 1024.0);
        let b = rect(512.0, 1536.0, 0.0, 1024.0);
        let area = a.intersection_area(&b);
        assert!((area - 512.0 * 1024.0).abs() < f32::EPSILON);
    }

    #[test]
    fn contains_is_half_open() {
        let a = rect(0.0, 64.0, 0.0, 64.0);
        assert!(a.contains(0.0, 0.0));
        assert!(!a.contains(64.0, 10.0));
    }

    #[test]
    fn distance_ignores_height() {
        let a = Position::new(0.0, -10.0, 0.0);
        let b = Position::new(3.0, 50.0, 4.0);
        assert!((a.distance_xz(&b) - 5.0).abs() < 1e-6);
    }
}
