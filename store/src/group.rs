//! Reflection group vote storage trait.

use crate::{Mutation, Predicate, StoreError, UpdateOutcome};
use tally_types::{GroupId, GroupMembership};

/// Trait for group membership storage operations.
pub trait GroupStore: Send + Sync {
    /// Insert or replace a group record. Used for seeding, not for voting.
    fn put_group(&self, group: &GroupMembership) -> Result<(), StoreError>;

    fn get_group(&self, id: &GroupId) -> Result<Option<GroupMembership>, StoreError>;

    /// Atomically apply `mutation` to the group under `id` if `predicate`
    /// holds for its current value.
    fn update_group_if(
        &self,
        id: &GroupId,
        predicate: Predicate<'_, GroupMembership>,
        mutation: Mutation<'_, GroupMembership>,
    ) -> Result<UpdateOutcome, StoreError>;

    /// All group records, in id order.
    fn iter_groups(&self) -> Result<Vec<GroupMembership>, StoreError>;
}

impl<T: GroupStore + ?Sized> GroupStore for std::sync::Arc<T> {
    fn put_group(&self, group: &GroupMembership) -> Result<(), StoreError> {
        (**self).put_group(group)
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<GroupMembership>, StoreError> {
        (**self).get_group(id)
    }

    fn update_group_if(
        &self,
        id: &GroupId,
        predicate: Predicate<'_, GroupMembership>,
        mutation: Mutation<'_, GroupMembership>,
    ) -> Result<UpdateOutcome, StoreError> {
        (**self).update_group_if(id, predicate, mutation)
    }

    fn iter_groups(&self) -> Result<Vec<GroupMembership>, StoreError> {
        (**self).iter_groups()
    }
}
