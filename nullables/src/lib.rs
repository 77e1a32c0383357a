//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies (clock, stores, alert delivery, authorization)
//! are abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be steered programmatically (forced outcomes, injected faults)
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod alert;
pub mod auth;
pub mod clock;
pub mod store;

pub use alert::NullAlertSink;
pub use auth::NullAuth;
pub use clock::NullClock;
pub use store::NullStore;
