//! The vote-casting saga.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tally_groups::GroupMembershipSet;
use tally_ledger::ResourceLedger;
use tally_store::{AlertSink, BudgetStore, ConsistencyAlert, GroupStore};
use tally_types::{AuthCapability, AuthToken, GroupId, MeetingId, MeetingMemberId, UserId};
use tracing::{field, info_span, Span};

use crate::{CastVoteError, ReentryPolicy, VoteMetrics};

/// Successful result of `cast_vote`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastReceipt {
    /// One unit was spent and the vote was added to the group.
    Cast,
    /// Under [`ReentryPolicy::NoopSuccess`]: the member already held the
    /// maximum number of votes on the group; nothing changed.
    AlreadyCast,
}

/// Progress of one `cast_vote` call.
///
/// Calls that end before a unit is reserved (unauthorized, budget exhausted,
/// already cast) finish in `Start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastState {
    Start,
    BudgetReserved,
    GroupJoinAttempted,
    Succeeded,
    /// The join was refused and the reserved unit was refunded.
    CompensatedRejected,
    /// A store faulted during the join and the reserved unit was refunded
    /// (or a refund failure was alerted).
    CompensatedFailed,
}

impl CastState {
    /// Whether a reserved unit had to be handed back.
    pub fn is_compensated(self) -> bool {
        matches!(self, CastState::CompensatedRejected | CastState::CompensatedFailed)
    }
}

/// A finished `cast_vote` call together with the state it ended in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CastAttempt {
    pub state: CastState,
    pub result: Result<CastReceipt, CastVoteError>,
}

impl fmt::Display for CastState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CastState::Start => "start",
            CastState::BudgetReserved => "budget_reserved",
            CastState::GroupJoinAttempted => "group_join_attempted",
            CastState::Succeeded => "succeeded",
            CastState::CompensatedRejected => "compensated_rejected",
            CastState::CompensatedFailed => "compensated_failed",
        };
        f.write_str(s)
    }
}

fn cast_vote_span(meeting_id: &MeetingId, user_id: &UserId, group_id: &GroupId) -> Span {
    info_span!(
        "cast_vote",
        meeting = %meeting_id,
        user = %user_id,
        group = %group_id,
        state = field::Empty,
    )
}

/// Orchestrates budget reservation, group join and compensation.
///
/// `B` backs the budgets and is always a single store. `G` backs the groups,
/// usually through a dual-store coordinator.
pub struct VoteCastingService<B, G> {
    ledger: ResourceLedger<B>,
    groups: GroupMembershipSet<G>,
    auth: Arc<dyn AuthCapability>,
    alerts: Arc<dyn AlertSink>,
    reentry: ReentryPolicy,
    metrics: Arc<VoteMetrics>,
}

impl<B: BudgetStore, G: GroupStore> VoteCastingService<B, G> {
    pub fn new(
        ledger: ResourceLedger<B>,
        groups: GroupMembershipSet<G>,
        auth: Arc<dyn AuthCapability>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            ledger,
            groups,
            auth,
            alerts,
            reentry: ReentryPolicy::default(),
            metrics: Arc::new(VoteMetrics::new()),
        }
    }

    pub fn with_reentry_policy(mut self, policy: ReentryPolicy) -> Self {
        self.reentry = policy;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<VoteMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn ledger(&self) -> &ResourceLedger<B> {
        &self.ledger
    }

    pub fn groups(&self) -> &GroupMembershipSet<G> {
        &self.groups
    }

    pub fn metrics(&self) -> &Arc<VoteMetrics> {
        &self.metrics
    }

    /// Spend one of `user_id`'s votes on `group_id`.
    ///
    /// The budget is reserved before the group is touched. If the join is
    /// refused or faults, the reserved unit is refunded before returning, so
    /// on every error path the budget is where it started. A refund that
    /// itself fails is reported as [`ConsistencyAlert::RefundFailed`] and
    /// does not change the returned error.
    pub fn cast_vote(
        &self,
        auth: &AuthToken,
        meeting_id: &MeetingId,
        user_id: &UserId,
        group_id: &GroupId,
        max_votes_per_group: u32,
    ) -> Result<CastReceipt, CastVoteError> {
        self.attempt(auth, meeting_id, user_id, group_id, max_votes_per_group)
            .result
    }

    /// Like [`cast_vote`](Self::cast_vote), also returning the terminal
    /// [`CastState`].
    pub fn attempt(
        &self,
        auth: &AuthToken,
        meeting_id: &MeetingId,
        user_id: &UserId,
        group_id: &GroupId,
        max_votes_per_group: u32,
    ) -> CastAttempt {
        let span = cast_vote_span(meeting_id, user_id, group_id);
        let _enter = span.enter();
        let started = Instant::now();

        let mut state = CastState::Start;
        let result = self.run(
            &mut state,
            auth,
            meeting_id,
            user_id,
            group_id,
            max_votes_per_group,
        );
        span.record("state", field::display(state));

        self.metrics
            .cast_vote_duration_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        match &result {
            Ok(CastReceipt::Cast) => self.metrics.votes_cast.inc(),
            Ok(CastReceipt::AlreadyCast) => self.metrics.already_cast.inc(),
            Err(e) => {
                self.metrics.record_rejection(e);
                tracing::warn!(user_id = %auth.viewer_id(), kind = e.kind(), error = %e, %state, "vote not cast");
            }
        }
        CastAttempt { state, result }
    }

    fn run(
        &self,
        state: &mut CastState,
        auth: &AuthToken,
        meeting_id: &MeetingId,
        user_id: &UserId,
        group_id: &GroupId,
        cap: u32,
    ) -> Result<CastReceipt, CastVoteError> {
        if !self.auth.is_meeting_member(auth, meeting_id) {
            return Err(CastVoteError::Unauthorized);
        }

        if self.reentry == ReentryPolicy::NoopSuccess && self.already_at_cap(group_id, user_id, cap)? {
            tracing::debug!("member already at cap, vote treated as cast");
            return Ok(CastReceipt::AlreadyCast);
        }

        let key = MeetingMemberId::new(meeting_id, user_id);
        match self.ledger.try_spend_one(&key) {
            Ok(true) => advance(state, CastState::BudgetReserved),
            Ok(false) => return Err(CastVoteError::BudgetExhausted),
            Err(e) => return Err(CastVoteError::TransientFailure(e.to_string())),
        }

        let joined = self.groups.try_join(group_id, user_id, cap);
        advance(state, CastState::GroupJoinAttempted);
        match joined {
            Ok(true) => {
                advance(state, CastState::Succeeded);
                Ok(CastReceipt::Cast)
            }
            Ok(false) => {
                self.compensate(&key);
                advance(state, CastState::CompensatedRejected);
                Err(CastVoteError::GroupCapacityExceeded)
            }
            Err(e) => {
                self.compensate(&key);
                advance(state, CastState::CompensatedFailed);
                Err(CastVoteError::TransientFailure(e.to_string()))
            }
        }
    }

    /// Whether the member already holds `cap` votes on the group.
    /// A missing group is not at cap; the join will report it. This is a
    /// read, not a reservation; the conditional join still enforces the cap.
    fn already_at_cap(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        cap: u32,
    ) -> Result<bool, CastVoteError> {
        if cap == 0 {
            return Ok(false);
        }
        match self.groups.occurrences(group_id, user_id) {
            Ok(n) => Ok(n >= cap as usize),
            Err(tally_groups::GroupError::GroupNotFound(_)) => Ok(false),
            Err(e) => Err(CastVoteError::TransientFailure(e.to_string())),
        }
    }

    fn compensate(&self, key: &MeetingMemberId) {
        match self.ledger.refund_one(key) {
            Ok(()) => {
                self.metrics.refunds.inc();
                tracing::debug!(member = %key, "reserved vote refunded");
            }
            Err(e) => {
                self.metrics.refund_failures.inc();
                tracing::error!(member = %key, error = %e, "refund failed, vote unit unaccounted for");
                self.alerts.report(ConsistencyAlert::RefundFailed {
                    key: key.to_string(),
                    amount: 1,
                    error: e.to_string(),
                });
            }
        }
    }
}

fn advance(state: &mut CastState, next: CastState) {
    tracing::debug!(from = %state, to = %next, "cast state");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_nullables::{NullAlertSink, NullAuth, NullClock, NullStore};
    use tally_types::{GroupMembership, Timestamp, VoterBudget};

    struct Harness {
        store: Arc<NullStore>,
        sink: Arc<NullAlertSink>,
        service: VoteCastingService<Arc<NullStore>, Arc<NullStore>>,
        token: AuthToken,
        meeting: MeetingId,
        user: UserId,
        group: GroupId,
    }

    fn harness(votes: u32) -> Harness {
        let store = Arc::new(NullStore::new());
        let sink = Arc::new(NullAlertSink::new());
        let clock = Arc::new(NullClock::new(1));
        let meeting = MeetingId::new("m1").unwrap();
        let user = UserId::new("u1").unwrap();
        let group = GroupId::new("g1").unwrap();
        store
            .put_budget(&VoterBudget::new(meeting.clone(), user.clone(), votes, Timestamp::EPOCH))
            .unwrap();
        store
            .put_group(&GroupMembership::new(group.clone(), meeting.clone(), Timestamp::EPOCH))
            .unwrap();
        let service = VoteCastingService::new(
            ResourceLedger::new(store.clone(), clock.clone()),
            GroupMembershipSet::new(store.clone(), clock),
            Arc::new(NullAuth::allow_all()),
            sink.clone(),
        );
        Harness {
            store,
            sink,
            service,
            token: AuthToken::new(user.clone()).with_meeting(meeting.clone()),
            meeting,
            user,
            group,
        }
    }

    impl Harness {
        fn cast(&self, cap: u32) -> Result<CastReceipt, CastVoteError> {
            self.service
                .cast_vote(&self.token, &self.meeting, &self.user, &self.group, cap)
        }

        fn attempt(&self, cap: u32) -> CastAttempt {
            self.service
                .attempt(&self.token, &self.meeting, &self.user, &self.group, cap)
        }

        fn remaining(&self) -> u32 {
            let key = MeetingMemberId::new(&self.meeting, &self.user);
            self.store.get_budget(&key).unwrap().unwrap().votes_remaining
        }
    }

    #[test]
    fn happy_path_spends_and_joins() {
        let h = harness(2);
        let attempt = h.attempt(3);
        assert_eq!(attempt.result, Ok(CastReceipt::Cast));
        assert_eq!(attempt.state, CastState::Succeeded);
        assert_eq!(h.remaining(), 1);
        assert_eq!(h.service.metrics().votes_cast.get(), 1);
    }

    #[test]
    fn terminal_states_follow_the_path_taken() {
        let h = harness(1);
        let rejected = h.attempt(0);
        assert_eq!(rejected.state, CastState::CompensatedRejected);
        assert!(rejected.state.is_compensated());

        h.store.fail_group_updates_after(0);
        let failed = h.attempt(1);
        assert_eq!(failed.state, CastState::CompensatedFailed);
        assert!(matches!(failed.result, Err(CastVoteError::TransientFailure(_))));

        h.store.heal();
        assert_eq!(h.attempt(1).state, CastState::Succeeded);
        let exhausted = h.attempt(1);
        assert_eq!(exhausted.result, Err(CastVoteError::BudgetExhausted));
        assert_eq!(exhausted.state, CastState::Start);
        assert!(!exhausted.state.is_compensated());
    }

    #[test]
    fn refund_failure_is_alerted_not_returned() {
        let h = harness(1);
        // The spend is the only budget update allowed; the refund faults.
        h.store.fail_budget_updates_after(1);
        h.store.force_group_outcome(Some(false));
        let attempt = h.attempt(1);
        assert_eq!(attempt.result, Err(CastVoteError::GroupCapacityExceeded));
        assert_eq!(attempt.state, CastState::CompensatedRejected);
        assert!(matches!(
            h.sink.alerts().as_slice(),
            [ConsistencyAlert::RefundFailed { amount: 1, .. }]
        ));
        assert_eq!(h.service.metrics().refund_failures.get(), 1);
        assert_eq!(h.remaining(), 0);
    }

    #[test]
    fn budget_fault_is_transient_with_nothing_reserved() {
        let h = harness(1);
        h.store.fail_budget_updates_after(0);
        let err = h.cast(1).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(h.store.group_update_calls(), 0);
        assert_eq!(h.remaining(), 1);
    }
}
