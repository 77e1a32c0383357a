//! Abstract storage traits for vote casting.
//!
//! Every storage backend (LMDB document store, SQLite relational store,
//! in-memory for testing) implements these traits. The rest of the codebase
//! depends only on the traits.
//!
//! The central primitive is the conditional update: `update_*_if(key,
//! predicate, mutation)` evaluates the predicate against the current record
//! and applies the mutation as one indivisible step inside the backend.
//! Nothing outside a backend ever reads a record and writes it back.

pub mod alert;
pub mod budget;
pub mod conditional;
pub mod error;
pub mod group;
pub mod meta;

pub use alert::{AlertSink, ConsistencyAlert};
pub use budget::BudgetStore;
pub use conditional::{Mutation, Predicate, StoreRole, UpdateOutcome};
pub use error::StoreError;
pub use group::GroupStore;
pub use meta::MetaStore;
