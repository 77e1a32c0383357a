//! Dual-store coordination for the live LMDB → SQLite migration.
//!
//! [`DualStoreCoordinator`] wraps an authoritative store and a shadow store
//! and implements the store traits itself. Every conditional update is issued
//! to both sides in parallel; the authoritative outcome is returned and any
//! disagreement is reported to an [`AlertSink`](tally_store::AlertSink).
//! Faults from either side are errors, never `false`.

pub mod alert;
pub mod coordinator;
pub mod error;
pub mod reconcile;

pub use alert::{ChannelAlertSink, TracingAlertSink};
pub use coordinator::DualStoreCoordinator;
pub use error::CoordinatorError;
pub use reconcile::{scan, ReconcileReport};
