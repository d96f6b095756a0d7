//! Shared type definitions for the Hivefall territorial-control core.
//!
//! Types defined here flow downstream to `TypeScript` via `ts-rs` for the
//! status panels, which only ever read them.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers (queens, parasites, hives, territories)
//! - [`enums`] -- Control status, queen phase, liberation reason
//! - [`structs`] -- Geometry values and read-only snapshots

pub mod enums;
pub mod ids;
pub mod structs;

pub use enums::{ControlStatus, LiberationReason, QueenPhase};
pub use ids::{HiveId, ParasiteId, ParseTerritoryIdError, QueenId, TerritoryId};
pub use structs::{
    BoundsRect, ChunkCoord, HiveStats, Position, QueenStats, TerritorySnapshot,
};
