//! Per-voter vote budget ledger.
//!
//! The ledger owns every mutation of [`tally_types::VoterBudget`] records:
//! a spend deducts votes only if enough remain, a refund returns votes as
//! compensation. Both are single conditional updates against the backing
//! store, so concurrent spenders against one record are linearized by the
//! store itself.

pub mod error;
pub mod ledger;

pub use error::LedgerError;
pub use ledger::ResourceLedger;
