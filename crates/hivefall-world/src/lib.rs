//! Territory grid, territory records and the territory store.
//!
//! This crate models the spatial side of territorial control: how world
//! coordinates map to 1024-unit territory cells, which chunks a territory
//! covers, and the keyed store of every territory record.
//!
//! # Modules
//!
//! - [`grid`] -- [`TerritoryGrid`] coordinate math and [`ChunkBounds`].
//! - [`territory`] -- The [`Territory`] record.
//! - [`store`] -- [`TerritoryStore`], overlap scanning and the
//!   [`TerritoryLookup`] trait.
//! - [`error`] -- Error types for grid and store operations.

pub mod error;
pub mod grid;
pub mod store;
pub mod territory;

pub use error::WorldError;
pub use grid::{ChunkBounds, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNKS_PER_AXIS, TerritoryGrid};
pub use store::{TerritoryLookup, TerritoryOverlap, TerritoryStore};
pub use territory::Territory;
