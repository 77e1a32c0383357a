//! Production alert sinks.

use tally_store::{AlertSink, ConsistencyAlert};
use tokio::sync::mpsc;

/// Logs every alert at `error` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn report(&self, alert: ConsistencyAlert) {
        tracing::error!(alert = %alert, "consistency alert");
    }
}

/// Queues alerts onto a bounded channel drained by an async consumer.
///
/// `report` uses `try_send`, so a full or closed channel never blocks the
/// request path; the alert is logged instead.
#[derive(Clone)]
pub struct ChannelAlertSink {
    tx: mpsc::Sender<ConsistencyAlert>,
}

impl ChannelAlertSink {
    pub fn new(tx: mpsc::Sender<ConsistencyAlert>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ConsistencyAlert>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl AlertSink for ChannelAlertSink {
    fn report(&self, alert: ConsistencyAlert) {
        if let Err(e) = self.tx.try_send(alert) {
            let alert = match e {
                mpsc::error::TrySendError::Full(a) | mpsc::error::TrySendError::Closed(a) => a,
            };
            tracing::error!(alert = %alert, "alert channel unavailable, alert logged only");
        }
    }
}
