//! Prometheus metrics for vote casting.
//!
//! [`VoteMetrics`] owns a dedicated [`Registry`]; [`VoteMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use std::sync::Arc;

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};
use tally_store::{AlertSink, ConsistencyAlert};

use crate::CastVoteError;

pub struct VoteMetrics {
    pub registry: Registry,

    // ── Outcomes ────────────────────────────────────────────────────────
    pub votes_cast: IntCounter,
    pub already_cast: IntCounter,
    pub unauthorized: IntCounter,
    pub budget_exhausted: IntCounter,
    pub capacity_exceeded: IntCounter,
    pub transient_failures: IntCounter,

    // ── Compensation and consistency ────────────────────────────────────
    pub refunds: IntCounter,
    pub refund_failures: IntCounter,
    pub divergence_alerts: IntCounter,

    // ── Latency ─────────────────────────────────────────────────────────
    /// Wall time of one `cast_vote` call, in milliseconds.
    pub cast_vote_duration_ms: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
        .expect("metric names are unique within a fresh registry")
}

impl VoteMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let votes_cast = counter(&registry, "tally_votes_cast_total", "Votes added to a group");
        let already_cast = counter(
            &registry,
            "tally_already_cast_total",
            "Repeat votes answered without a new reservation",
        );
        let unauthorized = counter(
            &registry,
            "tally_unauthorized_total",
            "Vote attempts by callers outside the meeting",
        );
        let budget_exhausted = counter(
            &registry,
            "tally_budget_exhausted_total",
            "Vote attempts with no votes remaining",
        );
        let capacity_exceeded = counter(
            &registry,
            "tally_capacity_exceeded_total",
            "Vote attempts rejected by the per-group cap",
        );
        let transient_failures = counter(
            &registry,
            "tally_transient_failures_total",
            "Vote attempts aborted by a store fault",
        );
        let refunds = counter(&registry, "tally_refunds_total", "Compensating refunds written");
        let refund_failures = counter(
            &registry,
            "tally_refund_failures_total",
            "Compensating refunds that could not be written",
        );
        let divergence_alerts = counter(
            &registry,
            "tally_divergence_alerts_total",
            "Consistency alerts raised between the two stores",
        );

        let cast_vote_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "tally_cast_vote_duration_ms",
                "cast_vote wall time in milliseconds"
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0]),
            registry
        )
        .expect("metric names are unique within a fresh registry");

        Self {
            registry,
            votes_cast,
            already_cast,
            unauthorized,
            budget_exhausted,
            capacity_exceeded,
            transient_failures,
            refunds,
            refund_failures,
            divergence_alerts,
            cast_vote_duration_ms,
        }
    }

    /// Count a finished `cast_vote` call under its outcome.
    pub fn record_rejection(&self, error: &CastVoteError) {
        match error {
            CastVoteError::Unauthorized => self.unauthorized.inc(),
            CastVoteError::BudgetExhausted => self.budget_exhausted.inc(),
            CastVoteError::GroupCapacityExceeded => self.capacity_exceeded.inc(),
            CastVoteError::TransientFailure(_) => self.transient_failures.inc(),
        }
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for VoteMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts every alert in `tally_divergence_alerts_total`, then forwards it.
pub struct MeteredAlertSink<S> {
    inner: S,
    metrics: Arc<VoteMetrics>,
}

impl<S: AlertSink> MeteredAlertSink<S> {
    pub fn new(inner: S, metrics: Arc<VoteMetrics>) -> Self {
        Self { inner, metrics }
    }
}

impl<S: AlertSink> AlertSink for MeteredAlertSink<S> {
    fn report(&self, alert: ConsistencyAlert) {
        self.metrics.divergence_alerts.inc();
        self.inner.report(alert);
    }
}
