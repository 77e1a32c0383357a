//! Store wiring and the operator commands.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::task::JoinHandle;

use tally_dualstore::{scan, ChannelAlertSink, DualStoreCoordinator, ReconcileReport, TracingAlertSink};
use tally_groups::GroupMembershipSet;
use tally_ledger::ResourceLedger;
use tally_store::{AlertSink, BudgetStore, GroupStore};
use tally_store_lmdb::{LmdbEnvironment, LmdbStore};
use tally_store_sqlite::SqliteStore;
use tally_types::{
    AuthToken, Clock, GroupId, GroupMembership, MeetingClaimsAuth, MeetingId, SystemClock,
    Timestamp, UserId, VoterBudget,
};
use tally_utils::{format_duration, LatencyStats};
use tally_voting::{CastReceipt, MeteredAlertSink, VoteCastingService, VoteMetrics, VotingConfig};

/// Alerts buffered between the request path and the logging task.
const ALERT_CHANNEL_CAPACITY: usize = 1024;

type DualStore = DualStoreCoordinator<LmdbStore, SqliteStore>;
type Service = VoteCastingService<LmdbStore, Arc<DualStore>>;

pub struct App {
    pair: Arc<DualStore>,
    service: Arc<Service>,
    metrics: Arc<VoteMetrics>,
    alerts: Arc<dyn AlertSink>,
    drain: JoinHandle<usize>,
    max_votes_per_group: u32,
    total_votes: u32,
}

impl App {
    /// Open both stores and wire the service over the dual pair.
    ///
    /// Must be called inside a tokio runtime; alerts are drained by a
    /// spawned task.
    pub fn open(config: &VotingConfig) -> anyhow::Result<Self> {
        let env = LmdbEnvironment::open(&config.lmdb_path, config.lmdb_map_size)
            .with_context(|| format!("opening LMDB at {}", config.lmdb_path.display()))?;
        if let Some(parent) = config.sqlite_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let sqlite = SqliteStore::open(&config.sqlite_path)
            .with_context(|| format!("opening SQLite at {}", config.sqlite_path.display()))?;

        let metrics = Arc::new(VoteMetrics::new());
        let (channel, mut rx) = ChannelAlertSink::channel(ALERT_CHANNEL_CAPACITY);
        let drain = tokio::spawn(async move {
            let mut delivered = 0;
            while let Some(alert) = rx.recv().await {
                TracingAlertSink.report(alert);
                delivered += 1;
            }
            delivered
        });
        let alerts: Arc<dyn AlertSink> = Arc::new(MeteredAlertSink::new(channel, metrics.clone()));

        let pair = Arc::new(DualStoreCoordinator::new(env.store(), sqlite, alerts.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        // Budgets live in LMDB alone; only group joins are mirrored.
        let service = VoteCastingService::new(
            ResourceLedger::new(env.store(), clock.clone()),
            GroupMembershipSet::new(pair.clone(), clock),
            Arc::new(MeetingClaimsAuth),
            alerts.clone(),
        )
        .with_reentry_policy(config.reentry_policy)
        .with_metrics(metrics.clone());

        Ok(Self {
            pair,
            service: Arc::new(service),
            metrics,
            alerts,
            drain,
            max_votes_per_group: config.max_votes_per_group,
            total_votes: config.total_votes,
        })
    }

    pub fn metrics(&self) -> &VoteMetrics {
        &self.metrics
    }

    /// Write budgets to the authoritative store and empty groups to both.
    /// Existing records under the same keys are replaced.
    pub fn seed(
        &self,
        meeting: &str,
        users: &[String],
        groups: &[String],
        votes: u32,
    ) -> anyhow::Result<()> {
        let meeting_id = MeetingId::new(meeting)?;
        let now = Timestamp::now();
        for user in users {
            let budget = VoterBudget::new(meeting_id.clone(), UserId::new(user.as_str())?, votes, now);
            self.pair.authoritative().put_budget(&budget)?;
        }
        for group in groups {
            let group = GroupMembership::new(GroupId::new(group.as_str())?, meeting_id.clone(), now);
            self.pair.put_group(&group)?;
        }
        tracing::info!(meeting, users = users.len(), groups = groups.len(), votes, "meeting seeded");
        Ok(())
    }

    /// Cast one vote on behalf of `user`, who is treated as a meeting member.
    pub fn cast(&self, meeting: &str, user: &str, group: &str) -> anyhow::Result<CastReceipt> {
        let meeting_id = MeetingId::new(meeting)?;
        let user_id = UserId::new(user)?;
        let group_id = GroupId::new(group)?;
        let token = AuthToken::new(user_id.clone()).with_meeting(meeting_id.clone());
        let receipt = self.service.cast_vote(
            &token,
            &meeting_id,
            &user_id,
            &group_id,
            self.max_votes_per_group,
        )?;
        Ok(receipt)
    }

    /// Seed a meeting, then run `voters` concurrent voters, each making
    /// `attempts` votes spread over the groups. Ends with a reconciliation.
    pub async fn simulate(
        &self,
        meeting: &str,
        voters: usize,
        groups: usize,
        attempts: u32,
    ) -> anyhow::Result<SimulationSummary> {
        anyhow::ensure!(groups > 0, "simulation needs at least one group");
        let users: Vec<String> = (0..voters).map(|i| format!("voter-{i:03}")).collect();
        let group_names: Vec<String> = (0..groups).map(|g| format!("group-{g}")).collect();
        self.seed(meeting, &users, &group_names, self.total_votes)?;

        let meeting_id = MeetingId::new(meeting)?;
        let group_ids = Arc::new(
            group_names
                .iter()
                .map(|g| GroupId::new(g.as_str()))
                .collect::<Result<Vec<_>, _>>()?,
        );
        let started = Instant::now();

        let mut handles = Vec::with_capacity(voters);
        for (i, user) in users.iter().enumerate() {
            let service = Arc::clone(&self.service);
            let group_ids = Arc::clone(&group_ids);
            let meeting_id = meeting_id.clone();
            let user_id = UserId::new(user.as_str())?;
            let cap = self.max_votes_per_group;
            // cast_vote blocks on store I/O; a started call always finishes
            // even if this future is dropped.
            handles.push(tokio::task::spawn_blocking(move || {
                let token = AuthToken::new(user_id.clone()).with_meeting(meeting_id.clone());
                let mut tally = VoterTally::default();
                for a in 0..attempts as usize {
                    let group_id = &group_ids[(i + a) % group_ids.len()];
                    let t = Instant::now();
                    let result = service.cast_vote(&token, &meeting_id, &user_id, group_id, cap);
                    tally.latencies.push(t.elapsed());
                    match result {
                        Ok(CastReceipt::Cast) => tally.cast += 1,
                        Ok(CastReceipt::AlreadyCast) => tally.already_cast += 1,
                        Err(e) => *tally.rejections.entry(e.kind()).or_default() += 1,
                    }
                }
                tally
            }));
        }

        let mut summary = SimulationSummary {
            voters,
            attempts: voters * attempts as usize,
            ..SimulationSummary::default()
        };
        let mut latencies = Vec::new();
        for handle in handles {
            let tally = handle.await.context("voter task panicked")?;
            summary.cast += tally.cast;
            summary.already_cast += tally.already_cast;
            for (kind, n) in tally.rejections {
                *summary.rejections.entry(kind).or_default() += n;
            }
            latencies.extend(tally.latencies);
        }
        summary.elapsed = started.elapsed();
        summary.latency = LatencyStats::from_samples(latencies);
        summary.drifts = self.reconcile()?.drifts.len();
        Ok(summary)
    }

    pub fn reconcile(&self) -> anyhow::Result<ReconcileReport> {
        Ok(scan(self.pair.authoritative(), self.pair.shadow(), self.alerts.as_ref())?)
    }

    /// Drop every alert sender and wait for queued alerts to be logged.
    /// Returns how many alerts were delivered over the process lifetime.
    pub async fn close(self) -> anyhow::Result<usize> {
        let App {
            pair,
            service,
            alerts,
            drain,
            ..
        } = self;
        drop((service, pair, alerts));
        Ok(drain.await?)
    }
}

#[derive(Default)]
struct VoterTally {
    cast: usize,
    already_cast: usize,
    rejections: BTreeMap<&'static str, usize>,
    latencies: Vec<Duration>,
}

#[derive(Default)]
pub struct SimulationSummary {
    pub voters: usize,
    pub attempts: usize,
    pub cast: usize,
    pub already_cast: usize,
    pub rejections: BTreeMap<&'static str, usize>,
    pub latency: LatencyStats,
    pub elapsed: Duration,
    /// Records that differ between the stores after the run.
    pub drifts: usize,
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} voters, {} attempts in {}",
            self.voters,
            self.attempts,
            format_duration(self.elapsed)
        )?;
        writeln!(f, "  cast: {}  already cast: {}", self.cast, self.already_cast)?;
        for (kind, n) in &self.rejections {
            writeln!(f, "  {kind}: {n}")?;
        }
        writeln!(f, "  latency: {}", self.latency)?;
        write!(f, "  drifted records: {}", self.drifts)
    }
}
