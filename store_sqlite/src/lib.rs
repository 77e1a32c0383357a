//! SQLite relational store backend for vote casting.
//!
//! Budgets live in `meeting_members`, group votes in `reflection_groups`
//! with `voter_ids` held as a JSON array. Conditional updates run inside a
//! `BEGIN IMMEDIATE` transaction, which takes the database write lock before
//! the record is read, so the test and the write are one atomic step.

pub mod error;
pub mod schema;
pub mod store;

pub use error::SqliteError;
pub use store::SqliteStore;
