//! Vote casting for retrospective meetings.
//!
//! [`VoteCastingService::cast_vote`] reserves one unit of the caller's budget,
//! then tries to add the vote to the target group. A rejected or failed join
//! refunds the reserved unit before the error is returned. The stores behind
//! the ledger and the group set are generic, so the same service runs over a
//! single backend or a dual-store coordinator.

pub mod config;
pub mod error;
pub mod metrics;
pub mod service;

pub use config::{ReentryPolicy, VotingConfig};
pub use error::{CastVoteError, ConfigError};
pub use metrics::{MeteredAlertSink, VoteMetrics};
pub use service::{CastAttempt, CastReceipt, CastState, VoteCastingService};
