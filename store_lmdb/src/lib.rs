//! LMDB document store backend for vote casting.
//!
//! Implements the storage traits from `tally-store` using the `heed` LMDB
//! bindings. Each record kind maps to one LMDB database within a single
//! environment. LMDB admits one write transaction at a time, so a
//! conditional update performed inside a write transaction is atomic with
//! respect to every other writer.

pub mod budget;
pub mod environment;
pub mod error;
pub mod group;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod store;

pub use budget::LmdbBudgetStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use group::LmdbGroupStore;
pub use meta::LmdbMetaStore;
pub use store::LmdbStore;
