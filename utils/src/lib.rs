//! Shared utilities for the tally workspace.

pub mod logging;
pub mod stats;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use stats::LatencyStats;
pub use time::format_duration;
