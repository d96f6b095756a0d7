//! Pure spatial math for the territory grid.
//!
//! The world is cut into square territories of `chunks_per_axis` chunks per
//! side, each chunk `chunk_size` units wide. With the defaults (16 chunks of
//! 64 units) a territory is 1024 units across.
//!
//! All functions are deterministic and free of side effects: the grid is the
//! authority the recovery layer falls back to when stored bounds drift.

use serde::{Deserialize, Serialize};

use hivefall_types::{BoundsRect, ChunkCoord, Position, TerritoryId};

use crate::error::WorldError;

/// Default number of chunks along each side of a territory.
pub const DEFAULT_CHUNKS_PER_AXIS: u16 = 16;

/// Default chunk width in world units.
pub const DEFAULT_CHUNK_SIZE: f32 = 64.0;

/// Chunk-aligned bounding box of a territory plus the chunks it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkBounds {
    /// The `[min, max)` rectangle, snapped outward to chunk boundaries.
    pub rect: BoundsRect,
    /// Every chunk the rectangle covers, row-major by X then Z.
    pub chunks: Vec<ChunkCoord>,
}

impl ChunkBounds {
    /// Positive-area intersection with another bounds box (0 when disjoint
    /// or merely touching).
    pub fn overlap_area(&self, other: &Self) -> f32 {
        self.rect.intersection_area(&other.rect)
    }
}

/// Territory grid dimensions and the coordinate math built on them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerritoryGrid {
    chunks_per_axis: u16,
    chunk_size: f32,
}

impl TerritoryGrid {
    /// Grid with the default 16 x 64-unit chunks.
    pub const fn new() -> Self {
        Self {
            chunks_per_axis: DEFAULT_CHUNKS_PER_AXIS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Grid with explicit dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGrid`] if either dimension is zero or
    /// the chunk size is not a positive finite number.
    pub fn with_dimensions(chunks_per_axis: u16, chunk_size: f32) -> Result<Self, WorldError> {
        if chunks_per_axis == 0 {
            return Err(WorldError::InvalidGrid {
                reason: "chunks_per_axis must be at least 1".to_owned(),
            });
        }
        if !chunk_size.is_finite() || chunk_size <= 0.0 {
            return Err(WorldError::InvalidGrid {
                reason: format!("chunk_size must be positive, got {chunk_size}"),
            });
        }
        Ok(Self {
            chunks_per_axis,
            chunk_size,
        })
    }

    /// Chunks per territory side.
    pub const fn chunks_per_axis(&self) -> u16 {
        self.chunks_per_axis
    }

    /// Chunk width in world units.
    pub const fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    /// Territory width in world units.
    pub fn territory_size(&self) -> f32 {
        f32::from(self.chunks_per_axis) * self.chunk_size
    }

    /// Id of the territory containing world point `(x, z)`.
    ///
    /// Uses floor division, so negative coordinates map to negative cells:
    /// `x = -1` lies in cell `-1`, not cell `0`.
    pub fn territory_id_at(&self, x: f32, z: f32) -> TerritoryId {
        let size = self.territory_size();
        TerritoryId::new(floor_to_cell(x / size), floor_to_cell(z / size))
    }

    /// Center of a territory cell, on the ground plane.
    pub fn territory_center(&self, id: TerritoryId) -> Position {
        let size = self.territory_size();
        #[allow(clippy::cast_precision_loss)] // cell indices are far below 2^24
        let (cell_x, cell_z) = (id.x as f32, id.z as f32);
        Position::ground(cell_x.mul_add(size, size / 2.0), cell_z.mul_add(size, size / 2.0))
    }

    /// Snap an arbitrary point to the center of the territory containing it.
    pub fn aligned_center(&self, x: f32, z: f32) -> Position {
        self.territory_center(self.territory_id_at(x, z))
    }

    /// Chunk-aligned bounds of a territory centred at `(center_x, center_z)`.
    ///
    /// Extends half a territory in each direction, then snaps outward to the
    /// chunk grid (`floor` for the minimum, `ceil` for the maximum). A
    /// centre that is not grid-aligned therefore produces bounds that
    /// straddle two cells.
    pub fn chunk_bounds(&self, center_x: f32, center_z: f32) -> ChunkBounds {
        let half = self.territory_size() / 2.0;
        let chunk = self.chunk_size;

        let min_chunk_x = floor_to_cell((center_x - half) / chunk);
        let max_chunk_x = ceil_to_cell((center_x + half) / chunk);
        let min_chunk_z = floor_to_cell((center_z - half) / chunk);
        let max_chunk_z = ceil_to_cell((center_z + half) / chunk);

        let mut chunks = Vec::new();
        for x in min_chunk_x..max_chunk_x {
            for z in min_chunk_z..max_chunk_z {
                chunks.push(ChunkCoord { x, z });
            }
        }

        #[allow(clippy::cast_precision_loss)] // chunk indices are far below 2^24
        let rect = BoundsRect {
            min_x: min_chunk_x as f32 * chunk,
            max_x: max_chunk_x as f32 * chunk,
            min_z: min_chunk_z as f32 * chunk,
            max_z: max_chunk_z as f32 * chunk,
        };

        ChunkBounds { rect, chunks }
    }
}

impl Default for TerritoryGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// `floor` then convert; saturates at the `i32` range.
#[allow(clippy::cast_possible_truncation)] // float-to-int `as` saturates
fn floor_to_cell(value: f32) -> i32 {
    value.floor() as i32
}

/// `ceil` then convert; saturates at the `i32` range.
#[allow(clippy::cast_possible_truncation)] // float-to-int `as` saturates
fn ceil_to_cell(value: f32) -> i32 {
    value.ceil() as i32
}
