//! Territory manager, frame driver and self-healing layer for Hivefall.
//!
//! This crate composes the grid, store and colony pieces into a running
//! simulation: a [`TerritoryManager`] that owns every territory, queen and
//! hive, a round-robin [`ThrottledScheduler`] for low-frequency systems,
//! and an [`ErrorRecoveryManager`] that periodically looks for drift and
//! repairs it.
//!
//! # Modules
//!
//! - [`clock`] -- Millisecond simulation clock and the scheduled-task
//!   queue.
//! - [`config`] -- Configuration loading from `hivefall-config.yaml` into
//!   strongly-typed structs.
//! - [`events`] -- [`TerritoryEvent`] and the [`TerritoryObserver`] trait.
//! - [`recovery`] -- Drift detection, corrections and retry bookkeeping.
//! - [`scheduler`] -- The round-robin throttled scheduler.
//! - [`simulation`] -- The per-frame [`Simulation`] driver.
//! - [`territory_manager`] -- Territory, queen and hive ownership.
//! - [`throttle`] -- Frame-time driven update throttle.
//!
//! [`TerritoryManager`]: territory_manager::TerritoryManager
//! [`ThrottledScheduler`]: scheduler::ThrottledScheduler
//! [`ErrorRecoveryManager`]: recovery::ErrorRecoveryManager
//! [`TerritoryEvent`]: events::TerritoryEvent
//! [`TerritoryObserver`]: events::TerritoryObserver
//! [`Simulation`]: simulation::Simulation

pub mod clock;
pub mod config;
pub mod events;
pub mod recovery;
pub mod scheduler;
pub mod simulation;
pub mod territory_manager;
pub mod throttle;
