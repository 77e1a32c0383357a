//! Fundamental types for retrospective vote casting.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! identifiers, the voter budget and group membership records, timestamps,
//! clocks, and the caller's auth token.

pub mod auth;
pub mod error;
pub mod ids;
pub mod records;
pub mod time;

pub use auth::{AuthCapability, AuthToken, MeetingClaimsAuth};
pub use error::TypesError;
pub use ids::{GroupId, MeetingId, MeetingMemberId, UserId};
pub use records::{GroupMembership, VoterBudget};
pub use time::{Clock, SystemClock, Timestamp};
