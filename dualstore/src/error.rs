use tally_store::{StoreError, StoreRole};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("{role} store failed: {source}")]
    Store {
        role: StoreRole,
        #[source]
        source: StoreError,
    },
}

impl CoordinatorError {
    pub fn authoritative(source: StoreError) -> Self {
        CoordinatorError::Store {
            role: StoreRole::Authoritative,
            source,
        }
    }

    pub fn shadow(source: StoreError) -> Self {
        CoordinatorError::Store {
            role: StoreRole::Shadow,
            source,
        }
    }

    pub fn role(&self) -> StoreRole {
        match self {
            CoordinatorError::Store { role, .. } => *role,
        }
    }
}

/// Keeps the fault class and prefixes the message with the failing side.
impl From<CoordinatorError> for StoreError {
    fn from(e: CoordinatorError) -> Self {
        let CoordinatorError::Store { role, source } = e;
        match source {
            StoreError::NotFound(m) => StoreError::NotFound(format!("{role} store: {m}")),
            StoreError::Unavailable(m) => StoreError::Unavailable(format!("{role} store: {m}")),
            StoreError::Backend(m) => StoreError::Backend(format!("{role} store: {m}")),
            StoreError::Serialization(m) => {
                StoreError::Serialization(format!("{role} store: {m}"))
            }
            StoreError::Corruption(m) => StoreError::Corruption(format!("{role} store: {m}")),
        }
    }
}
