//! LMDB backend: persistence and conditional-update behavior against a real
//! environment in a temporary directory.

use std::sync::Arc;
use std::thread;

use tally_store::{BudgetStore, GroupStore, MetaStore};
use tally_store_lmdb::environment::DEFAULT_MAP_SIZE;
use tally_store_lmdb::migration::CURRENT_SCHEMA_VERSION;
use tally_store_lmdb::LmdbEnvironment;
use tally_types::{GroupId, GroupMembership, MeetingId, MeetingMemberId, Timestamp, UserId, VoterBudget};

fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open(dir.path(), 64 * 1024 * 1024).expect("open env");
    (dir, env)
}

fn budget(user: &str, votes: u32) -> VoterBudget {
    VoterBudget::new(
        MeetingId::new("m1").unwrap(),
        UserId::new(user).unwrap(),
        votes,
        Timestamp::EPOCH,
    )
}

#[test]
fn budget_put_get_roundtrip() {
    let (_dir, env) = temp_env();
    let store = env.budget_store();
    let record = budget("u1", 5);
    store.put_budget(&record).unwrap();
    assert_eq!(store.get_budget(&record.key()).unwrap(), Some(record));
}

#[test]
fn conditional_update_respects_predicate() {
    let (_dir, env) = temp_env();
    let store = env.budget_store();
    let record = budget("u1", 1);
    store.put_budget(&record).unwrap();

    let spend = |b: &mut VoterBudget| b.votes_remaining -= 1;
    let has_vote = |b: &VoterBudget| b.votes_remaining >= 1;

    assert!(store.update_budget_if(&record.key(), &has_vote, &spend).unwrap().applied);
    assert!(!store.update_budget_if(&record.key(), &has_vote, &spend).unwrap().applied);
    assert_eq!(
        store.get_budget(&record.key()).unwrap().unwrap().votes_remaining,
        0
    );
}

#[test]
fn conditional_update_on_missing_key_is_not_applied() {
    let (_dir, env) = temp_env();
    let store = env.group_store();
    let outcome = store
        .update_group_if(
            &GroupId::new("nope").unwrap(),
            &|_: &GroupMembership| true,
            &|_: &mut GroupMembership| {},
        )
        .unwrap();
    assert!(!outcome.applied);
}

#[test]
fn schema_version_is_stamped_and_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).unwrap();
        env.budget_store().put_budget(&budget("u1", 2)).unwrap();
        assert_eq!(
            env.meta_store().get_schema_version().unwrap(),
            CURRENT_SCHEMA_VERSION
        );
    }
    let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).unwrap();
    let key = MeetingMemberId::new(&MeetingId::new("m1").unwrap(), &UserId::new("u1").unwrap());
    assert_eq!(
        env.budget_store().get_budget(&key).unwrap().unwrap().votes_remaining,
        2
    );
}

#[test]
fn concurrent_spends_never_overdraw() {
    let (_dir, env) = temp_env();
    let store = Arc::new(env.budget_store());
    let record = budget("u1", 10);
    store.put_budget(&record).unwrap();
    let key = record.key();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let store = Arc::clone(&store);
            let key = key.clone();
            thread::spawn(move || {
                store
                    .update_budget_if(
                        &key,
                        &|b: &VoterBudget| b.votes_remaining >= 1,
                        &|b: &mut VoterBudget| b.votes_remaining -= 1,
                    )
                    .unwrap()
                    .applied
            })
        })
        .collect();

    let applied = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|a| *a)
        .count();
    assert_eq!(applied, 10);
    assert_eq!(store.get_budget(&key).unwrap().unwrap().votes_remaining, 0);
}

#[test]
fn groups_iterate_in_id_order() {
    let (_dir, env) = temp_env();
    let store = env.group_store();
    for id in ["g2", "g1", "g3"] {
        store
            .put_group(&GroupMembership::new(
                GroupId::new(id).unwrap(),
                MeetingId::new("m1").unwrap(),
                Timestamp::EPOCH,
            ))
            .unwrap();
    }
    let ids: Vec<String> = store
        .iter_groups()
        .unwrap()
        .into_iter()
        .map(|g| g.id.to_string())
        .collect();
    assert_eq!(ids, vec!["g1", "g2", "g3"]);
}
