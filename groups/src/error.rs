use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group {0} not found")]
    GroupNotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] tally_store::StoreError),
}
