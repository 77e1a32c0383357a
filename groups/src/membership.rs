//! Capped append of voter ids to a group record.

use std::sync::Arc;

use tally_store::GroupStore;
use tally_types::{Clock, GroupId, GroupMembership, UserId};

use crate::GroupError;

/// Atomic join operations on group vote sets.
pub struct GroupMembershipSet<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: GroupStore> GroupMembershipSet<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append `member_id` if it occurs fewer than `cap` times.
    ///
    /// Returns `Ok(true)` iff the append happened. A full group or a missing
    /// group record is `Ok(false)`; only store faults are errors.
    pub fn try_join(
        &self,
        group_id: &GroupId,
        member_id: &UserId,
        cap: u32,
    ) -> Result<bool, GroupError> {
        let now = self.clock.now();
        let cap = cap as usize;
        let outcome = self.store.update_group_if(
            group_id,
            &|group: &GroupMembership| group.occurrences(member_id) < cap,
            &|group: &mut GroupMembership| {
                group.voter_ids.push(member_id.clone());
                group.updated_at = now;
            },
        )?;
        tracing::debug!(group = %group_id, member = %member_id, cap, joined = outcome.applied, "group join");
        Ok(outcome.applied)
    }

    /// How many votes `member_id` currently holds on the group.
    pub fn occurrences(&self, group_id: &GroupId, member_id: &UserId) -> Result<usize, GroupError> {
        let group = self
            .store
            .get_group(group_id)?
            .ok_or_else(|| GroupError::GroupNotFound(group_id.to_string()))?;
        Ok(group.occurrences(member_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_nullables::{NullClock, NullStore};
    use tally_types::{MeetingId, Timestamp};

    fn setup() -> (GroupMembershipSet<Arc<NullStore>>, GroupId) {
        let store = Arc::new(NullStore::new());
        let id = GroupId::new("g1").unwrap();
        store
            .put_group(&GroupMembership::new(
                id.clone(),
                MeetingId::new("m1").unwrap(),
                Timestamp::EPOCH,
            ))
            .unwrap();
        (
            GroupMembershipSet::new(store, Arc::new(NullClock::new(7))),
            id,
        )
    }

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    #[test]
    fn join_appends_until_cap() {
        let (set, id) = setup();
        assert!(set.try_join(&id, &user("a"), 2).unwrap());
        assert!(set.try_join(&id, &user("a"), 2).unwrap());
        assert!(!set.try_join(&id, &user("a"), 2).unwrap());
        assert_eq!(set.occurrences(&id, &user("a")).unwrap(), 2);
    }

    #[test]
    fn cap_is_per_member() {
        let (set, id) = setup();
        assert!(set.try_join(&id, &user("a"), 1).unwrap());
        assert!(set.try_join(&id, &user("b"), 1).unwrap());
        assert!(!set.try_join(&id, &user("a"), 1).unwrap());
    }

    #[test]
    fn zero_cap_never_joins() {
        let (set, id) = setup();
        assert!(!set.try_join(&id, &user("a"), 0).unwrap());
        assert_eq!(set.occurrences(&id, &user("a")).unwrap(), 0);
    }

    #[test]
    fn join_stamps_updated_at() {
        let (set, id) = setup();
        set.try_join(&id, &user("a"), 1).unwrap();
        let group = set.store().get_group(&id).unwrap().unwrap();
        assert_eq!(group.updated_at, Timestamp::from_millis(7));
    }

    #[test]
    fn missing_group() {
        let (set, _) = setup();
        let absent = GroupId::new("absent").unwrap();
        assert!(!set.try_join(&absent, &user("a"), 3).unwrap());
        assert!(matches!(
            set.occurrences(&absent, &user("a")),
            Err(GroupError::GroupNotFound(_))
        ));
    }
}
