//! Error types for the `hivefall-colony` crate.

use hivefall_types::{HiveId, QueenId, QueenPhase};

/// Errors from state-machine operations that have preconditions.
///
/// Ordinary gameplay calls (damage, parasite control, updates) never fail;
/// these errors come from activation and repair calls made against a
/// record in the wrong state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColonyError {
    /// No queen with this id is registered.
    #[error("queen not found: {0}")]
    QueenNotFound(QueenId),

    /// No hive with this id is registered.
    #[error("hive not found: {0}")]
    HiveNotFound(HiveId),

    /// The queen has been destroyed and can no longer change state.
    #[error("queen {0} is destroyed")]
    QueenDestroyed(QueenId),

    /// A hive was offered to a queen that is building a different one.
    #[error("queen {queen_id} is building {expected:?}, not {found}")]
    HiveMismatch {
        /// The queen.
        queen_id: QueenId,
        /// The hive the queen references.
        expected: Option<HiveId>,
        /// The hive that was offered.
        found: HiveId,
    },

    /// The operation is not legal in the queen's current phase.
    #[error("queen {queen_id} cannot do that in phase {phase}")]
    WrongPhase {
        /// The queen.
        queen_id: QueenId,
        /// Her current phase.
        phase: QueenPhase,
    },
}
