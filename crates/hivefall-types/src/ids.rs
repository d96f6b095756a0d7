//! Type-safe identifier wrappers.
//!
//! Every entity in the territorial core has a strongly-typed ID so that a
//! queen id can never be passed where a parasite id is expected.
//!
//! - [`QueenId`] and [`ParasiteId`] wrap UUID v7 (time-ordered) values.
//! - [`HiveId`] is derived from the owning territory, queen and creation
//!   time, so it is a string newtype.
//! - [`TerritoryId`] is a value type holding the signed grid coordinates of
//!   a territory cell. Its canonical text form is `territory_{x}_{z}`.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a queen.
    QueenId
}

define_id! {
    /// Unique identifier for a parasite owned by the external parasite
    /// subsystem.
    ParasiteId
}

// ---------------------------------------------------------------------------
// HiveId
// ---------------------------------------------------------------------------

/// Identifier of a hive, derived from territory id, queen id and the
/// simulation time (milliseconds) at which construction began.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HiveId(pub String);

impl HiveId {
    /// Derive the id for a hive started by `queen` in `territory` at
    /// `created_at_ms`.
    pub fn derive(territory: TerritoryId, queen: QueenId, created_at_ms: u64) -> Self {
        Self(format!("hive_{territory}_{queen}_{created_at_ms}"))
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// TerritoryId
// ---------------------------------------------------------------------------

/// Prefix of the canonical territory id text form.
const TERRITORY_PREFIX: &str = "territory_";

/// Error returned when a string is not a valid `territory_{x}_{z}` id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed territory id: {0:?}")]
pub struct ParseTerritoryIdError(pub String);

/// Grid coordinates of a territory cell.
///
/// Coordinates are signed: cells west or south of the origin have negative
/// components. The text form is `territory_{x}_{z}`, e.g. `territory_-1_3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TerritoryId {
    /// Cell index along the world X axis.
    pub x: i32,
    /// Cell index along the world Z axis.
    pub z: i32,
}

impl TerritoryId {
    /// Create a territory id from grid coordinates.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Return the ids of the eight surrounding cells, whether or not a
    /// territory exists there. Cells at the `i32` boundary are skipped.
    pub fn surrounding(self) -> Vec<Self> {
        let mut out = Vec::with_capacity(8);
        for dx in -1_i32..=1 {
            for dz in -1_i32..=1 {
                if dx == 0 && dz == 0 {
                    continue;
                }
                if let (Some(x), Some(z)) = (self.x.checked_add(dx), self.z.checked_add(dz)) {
                    out.push(Self::new(x, z));
                }
            }
        }
        out
    }
}

impl fmt::Display for TerritoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TERRITORY_PREFIX}{}_{}", self.x, self.z)
    }
}

impl FromStr for TerritoryId {
    type Err = ParseTerritoryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseTerritoryIdError(s.to_owned());
        let rest = s.strip_prefix(TERRITORY_PREFIX).ok_or_else(malformed)?;
        let (x, z) = rest.split_once('_').ok_or_else(malformed)?;
        let x = x.parse::<i32>().map_err(|_err| malformed())?;
        let z = z.parse::<i32>().map_err(|_err| malformed())?;
        Ok(Self { x, z })
    }
}

impl TryFrom<String> for TerritoryId {
    type Error = ParseTerritoryIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TerritoryId> for String {
    fn from(id: TerritoryId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let queen = QueenId::new();
        let parasite = ParasiteId::new();
        assert_ne!(queen.into_inner(), Uuid::nil());
        assert_ne!(parasite.into_inner(), Uuid::nil());
    }

    #[test]
    fn territory_id_text_form() {
        assert_eq!(TerritoryId::new(3, -2).to_string(), "territory_3_-2");
        assert_eq!(
            "territory_-1_-7".parse::<TerritoryId>(),
            Ok(TerritoryId::new(-1, -7))
        );
    }

    #[test]
    fn malformed_territory_ids_are_rejected() {
        let malformed = [
            "",
            "territory_",
            "territory_1",
            "territory_a_b",
            "hive_1_2",
            "territory_1_2_3",
        ];
        for bad in malformed {
            assert!(bad.parse::<TerritoryId>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn surrounding_has_eight_cells() {
        let around = TerritoryId::new(0, 0).surrounding();
        assert_eq!(around.len(), 8);
        assert!(!around.contains(&TerritoryId::new(0, 0)));
        assert!(around.contains(&TerritoryId::new(-1, -1)));
        assert!(around.contains(&TerritoryId::new(1, 1)));
    }

    #[test]
    fn territory_id_serializes_as_string() {
        let id = TerritoryId::new(4, -9);
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"territory_4_-9\""));
        let back: Result<TerritoryId, _> = serde_json::from_str("\"territory_4_-9\"");
        assert_eq!(back.ok(), Some(id));
    }

    #[test]
    fn hive_id_embeds_owner_ids() {
        let queen = QueenId::new();
        let hive = HiveId::derive(TerritoryId::new(1, 2), queen, 1500);
        assert!(hive.as_str().starts_with("hive_territory_1_2_"));
        assert!(hive.as_str().ends_with("_1500"));
        assert!(hive.as_str().contains(&queen.to_string()));
    }
}
