//! Coordinator over the real backends: LMDB authoritative, SQLite shadow.

use std::sync::Arc;
use std::thread;

use tally_dualstore::{scan, DualStoreCoordinator};
use tally_groups::GroupMembershipSet;
use tally_ledger::ResourceLedger;
use tally_nullables::{NullAlertSink, NullClock, NullStore};
use tally_store::{BudgetStore, ConsistencyAlert, GroupStore};
use tally_store_lmdb::{LmdbEnvironment, LmdbStore};
use tally_store_sqlite::SqliteStore;
use tally_types::{
    GroupId, GroupMembership, MeetingId, MeetingMemberId, Timestamp, UserId, VoterBudget,
};

type Pair = DualStoreCoordinator<LmdbStore, SqliteStore>;

struct Fixture {
    _dir: tempfile::TempDir,
    pair: Arc<Pair>,
    sink: Arc<NullAlertSink>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open(&dir.path().join("lmdb"), 64 * 1024 * 1024).expect("lmdb");
    let sqlite = SqliteStore::open(&dir.path().join("shadow.db")).expect("sqlite");
    let sink = Arc::new(NullAlertSink::new());
    let pair = DualStoreCoordinator::new(env.store(), sqlite, sink.clone());
    Fixture {
        _dir: dir,
        pair: Arc::new(pair),
        sink,
    }
}

fn meeting() -> MeetingId {
    MeetingId::new("retro-42").unwrap()
}

fn group_id() -> GroupId {
    GroupId::new("went-well").unwrap()
}

/// Budgets go to the authoritative store only; the group goes to both.
fn seed<A: BudgetStore + GroupStore, B: GroupStore>(
    pair: &DualStoreCoordinator<A, B>,
    users: &[&str],
    votes: u32,
) {
    for user in users {
        pair.authoritative().put_budget(&VoterBudget::new(
            meeting(),
            UserId::new(*user).unwrap(),
            votes,
            Timestamp::EPOCH,
        ))
        .unwrap();
    }
    pair.put_group(&GroupMembership::new(group_id(), meeting(), Timestamp::EPOCH))
        .unwrap();
}

#[test]
fn concurrent_votes_keep_stores_identical() {
    let f = fixture();
    let users = ["ann", "bob", "cy", "dee"];
    seed(f.pair.as_ref(), &users, 3);

    let clock = Arc::new(NullClock::new(1_000));
    let ledger = Arc::new(ResourceLedger::new(f.pair.authoritative().clone(), clock.clone()));
    let groups = Arc::new(GroupMembershipSet::new(f.pair.clone(), clock));

    // One thread per voter: votes of different users interleave on the shared
    // group record, while each user's own votes stay ordered.
    let handles: Vec<_> = users
        .iter()
        .map(|user| {
            let ledger = Arc::clone(&ledger);
            let groups = Arc::clone(&groups);
            let user = UserId::new(*user).unwrap();
            thread::spawn(move || {
                let key = MeetingMemberId::new(&meeting(), &user);
                for _ in 0..4 {
                    if ledger.try_spend_one(&key).unwrap()
                        && !groups.try_join(&group_id(), &user, 2).unwrap()
                    {
                        ledger.refund_one(&key).unwrap();
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(f.sink.count(), 0);
    let report = scan(f.pair.authoritative(), f.pair.shadow(), f.sink.as_ref()).unwrap();
    assert!(report.is_consistent(), "{:?}", report.drifts);
    assert_eq!(report.groups_checked, 1);

    let group = f.pair.get_group(&group_id()).unwrap().unwrap();
    assert_eq!(group.voter_ids.len(), 8);
    for user in users {
        let user = UserId::new(user).unwrap();
        assert_eq!(group.occurrences(&user), 2);
        let key = MeetingMemberId::new(&meeting(), &user);
        let budget = f.pair.authoritative().get_budget(&key).unwrap().unwrap();
        assert_eq!(budget.votes_remaining, 1);
        assert!(f.pair.shadow().get_budget(&key).unwrap().is_none());
    }
}

#[test]
fn direct_shadow_edit_shows_up_as_drift() {
    let f = fixture();
    seed(f.pair.as_ref(), &["ann"], 5);
    let mut edited = GroupMembership::new(group_id(), meeting(), Timestamp::EPOCH);
    edited.voter_ids.push(UserId::new("ann").unwrap());
    f.pair.shadow().put_group(&edited).unwrap();

    let report = scan(f.pair.authoritative(), f.pair.shadow(), f.sink.as_ref()).unwrap();
    assert_eq!(report.drifts.len(), 1);
    assert!(matches!(
        &report.drifts[0],
        ConsistencyAlert::RecordDrift { key, .. } if key == "went-well"
    ));
    assert_eq!(f.sink.count(), 1);
}

#[test]
fn shadow_outcome_disagreement_alerts_once() {
    let sink = Arc::new(NullAlertSink::new());
    let shadow = Arc::new(NullStore::new());
    let dir = tempfile::tempdir().unwrap();
    let env = LmdbEnvironment::open(dir.path(), 64 * 1024 * 1024).unwrap();
    let pair = Arc::new(DualStoreCoordinator::new(env.store(), shadow.clone(), sink.clone()));
    seed(pair.as_ref(), &["ann"], 1);
    shadow.force_group_outcome(Some(false));

    let groups = GroupMembershipSet::new(pair.clone(), Arc::new(NullClock::new(0)));
    let ann = UserId::new("ann").unwrap();
    assert!(groups.try_join(&group_id(), &ann, 1).unwrap());
    assert_eq!(sink.count(), 1);
    assert_eq!(pair.authoritative().get_group(&group_id()).unwrap().unwrap().occurrences(&ann), 1);
    assert_eq!(shadow.get_group(&group_id()).unwrap().unwrap().occurrences(&ann), 0);
}
