//! Building blocks of the conditional-update primitive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition evaluated against the current record inside the backend's
/// atomic section. `Sync` so one closure can be handed to two stores at once.
pub type Predicate<'a, R> = &'a (dyn Fn(&R) -> bool + Sync);

/// Change applied to the record when the predicate holds. Must not alter the
/// record's key.
pub type Mutation<'a, R> = &'a (dyn Fn(&mut R) + Sync);

/// Result of a conditional update.
///
/// `applied == false` covers both "predicate did not hold" and "no record
/// under that key"; neither is a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub applied: bool,
}

impl UpdateOutcome {
    pub const APPLIED: Self = Self { applied: true };
    pub const UNCHANGED: Self = Self { applied: false };

    pub fn from_applied(applied: bool) -> Self {
        Self { applied }
    }
}

/// Which side of a store pair an operation ran against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreRole {
    /// The system of record; its outcome decides caller-visible behavior.
    Authoritative,
    /// Validated in shadow during the migration.
    Shadow,
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreRole::Authoritative => f.write_str("authoritative"),
            StoreRole::Shadow => f.write_str("shadow"),
        }
    }
}
