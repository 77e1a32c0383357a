use thiserror::Error;

/// Caller-visible outcome of a vote that was not cast.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CastVoteError {
    #[error("Not a member of this meeting")]
    Unauthorized,

    #[error("No votes remaining")]
    BudgetExhausted,

    #[error("Max votes per group exceeded")]
    GroupCapacityExceeded,

    #[error("transient failure: {0}")]
    TransientFailure(String),
}

impl CastVoteError {
    /// Whether the same request may succeed when retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CastVoteError::TransientFailure(_))
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CastVoteError::Unauthorized => "unauthorized",
            CastVoteError::BudgetExhausted => "budget_exhausted",
            CastVoteError::GroupCapacityExceeded => "group_capacity_exceeded",
            CastVoteError::TransientFailure(_) => "transient_failure",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("invalid config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_retry() {
        assert!(CastVoteError::TransientFailure("offline".into()).is_retryable());
        assert!(!CastVoteError::Unauthorized.is_retryable());
        assert!(!CastVoteError::BudgetExhausted.is_retryable());
        assert!(!CastVoteError::GroupCapacityExceeded.is_retryable());
    }
}
