//! Out-of-band reports about the two stores drifting apart.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::StoreRole;

/// A consistency problem that does not fail the request but needs
/// operational follow-up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsistencyAlert {
    /// Both stores answered, with different outcomes.
    OutcomeMismatch {
        operation: String,
        key: String,
        authoritative: bool,
        shadow: bool,
    },
    /// One store applied the write while the other faulted.
    PartialWrite {
        operation: String,
        key: String,
        applied_in: StoreRole,
        failed_in: StoreRole,
        error: String,
    },
    /// A compensating refund could not be written; a vote unit is
    /// unaccounted for.
    RefundFailed {
        key: String,
        amount: u32,
        error: String,
    },
    /// A reconciliation scan found a group that differs between the stores.
    RecordDrift {
        key: String,
        detail: String,
    },
}

impl fmt::Display for ConsistencyAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyAlert::OutcomeMismatch {
                operation,
                key,
                authoritative,
                shadow,
            } => write!(
                f,
                "{operation} outcome mismatch on {key}: authoritative={authoritative} shadow={shadow}"
            ),
            ConsistencyAlert::PartialWrite {
                operation,
                key,
                applied_in,
                failed_in,
                error,
            } => write!(
                f,
                "{operation} on {key} applied in {applied_in} store but failed in {failed_in} store: {error}"
            ),
            ConsistencyAlert::RefundFailed { key, amount, error } => {
                write!(f, "refund of {amount} to {key} failed: {error}")
            }
            ConsistencyAlert::RecordDrift { key, detail } => {
                write!(f, "group {key} drifted: {detail}")
            }
        }
    }
}

/// Receiver of consistency alerts.
///
/// `report` is called on the request path and must return without blocking.
pub trait AlertSink: Send + Sync {
    fn report(&self, alert: ConsistencyAlert);
}

impl<T: AlertSink + ?Sized> AlertSink for std::sync::Arc<T> {
    fn report(&self, alert: ConsistencyAlert) {
        (**self).report(alert)
    }
}
