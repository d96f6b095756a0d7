//! Error types for the `hivefall-world` crate.

use hivefall_types::{ParseTerritoryIdError, TerritoryId};

/// Errors that can occur during territory-store operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A territory was not found in the store.
    #[error("territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    /// A territory id string could not be parsed.
    #[error("{source}")]
    MalformedTerritoryId {
        /// The underlying parse error.
        #[from]
        source: ParseTerritoryIdError,
    },

    /// The grid dimensions are unusable (zero chunks, non-positive size).
    #[error("invalid grid: {reason}")]
    InvalidGrid {
        /// Explanation of what is wrong with the dimensions.
        reason: String,
    },
}
