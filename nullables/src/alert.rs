//! Nullable alert sink: record alerts instead of delivering them.

use std::sync::Mutex;
use tally_store::{AlertSink, ConsistencyAlert};

/// Collects every reported alert for later assertions.
#[derive(Default)]
pub struct NullAlertSink {
    reported: Mutex<Vec<ConsistencyAlert>>,
}

impl NullAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All alerts reported so far, in order.
    pub fn alerts(&self) -> Vec<ConsistencyAlert> {
        self.reported.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.reported.lock().unwrap().len()
    }

    pub fn reset(&self) {
        self.reported.lock().unwrap().clear();
    }
}

impl AlertSink for NullAlertSink {
    fn report(&self, alert: ConsistencyAlert) {
        self.reported.lock().unwrap().push(alert);
    }
}
