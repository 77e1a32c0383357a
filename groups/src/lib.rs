//! Reflection group vote sets.
//!
//! A group's `voter_ids` holds one entry per vote. Joining appends the voter
//! only while their occurrence count is below the per-group cap, as a single
//! conditional update against the backing store.

pub mod error;
pub mod membership;

pub use error::GroupError;
pub use membership::GroupMembershipSet;
