use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("amount must be at least 1")]
    ZeroAmount,

    #[error("no budget record for {0}")]
    UnknownBudget(String),

    #[error("refund of {amount} to {key} would overflow the budget counter")]
    RefundOverflow { key: String, amount: u32 },

    #[error("storage error: {0}")]
    Storage(#[from] tally_store::StoreError),
}
