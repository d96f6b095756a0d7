//! Queen and hive state machines and liberation windows.
//!
//! These are the per-territory lifecycle pieces of the territorial-control
//! core. None of them hold references to each other: a queen knows her
//! hive by id, a hive knows its queen by id, and every mutating call
//! returns the events the territory manager needs to keep the records
//! consistent.
//!
//! # Modules
//!
//! - [`queen`] -- [`Queen`] growth, construction and control lifecycle.
//! - [`hive`] -- [`Hive`] construction and defensive swarm.
//! - [`liberation`] -- [`LiberationManager`] windows, rewards and history.
//! - [`collaborators`] -- Traits for the external energy, parasite and
//!   defender systems.
//! - [`config`] -- [`ColonyConfig`] and the hard value limits.
//! - [`events`] -- Lifecycle events and [`DamageOutcome`].
//! - [`error`] -- [`ColonyError`].

pub mod collaborators;
pub mod config;
pub mod error;
pub mod events;
pub mod hive;
pub mod liberation;
pub mod queen;

pub use collaborators::{DefenseSpawner, EnergySystem, ParasiteSource, ParasiteView};
pub use config::{ColonyConfig, HiveConfig, LiberationConfig, QueenConfig};
pub use error::ColonyError;
pub use events::{DamageOutcome, HiveEvent, LiberationEvent, QueenEvent};
pub use hive::{Hive, HiveOverride, HiveSpawn};
pub use liberation::{
    LiberationManager, LiberationObserver, LiberationRecord, LiberationStats, LiberationStatus,
};
pub use queen::{Queen, QueenOverride, QueenSpawn, UNDERGROUND_DEPTH};
