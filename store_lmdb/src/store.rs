//! Budget and group stores of one environment behind a single handle.

use tally_store::{BudgetStore, GroupStore, Mutation, Predicate, StoreError, UpdateOutcome};
use tally_types::{GroupId, GroupMembership, MeetingMemberId, VoterBudget};

use crate::{LmdbBudgetStore, LmdbGroupStore};

#[derive(Clone)]
pub struct LmdbStore {
    budgets: LmdbBudgetStore,
    groups: LmdbGroupStore,
}

impl LmdbStore {
    pub(crate) fn new(budgets: LmdbBudgetStore, groups: LmdbGroupStore) -> Self {
        Self { budgets, groups }
    }
}

impl BudgetStore for LmdbStore {
    fn put_budget(&self, budget: &VoterBudget) -> Result<(), StoreError> {
        self.budgets.put_budget(budget)
    }

    fn get_budget(&self, key: &MeetingMemberId) -> Result<Option<VoterBudget>, StoreError> {
        self.budgets.get_budget(key)
    }

    fn update_budget_if(
        &self,
        key: &MeetingMemberId,
        predicate: Predicate<'_, VoterBudget>,
        mutation: Mutation<'_, VoterBudget>,
    ) -> Result<UpdateOutcome, StoreError> {
        self.budgets.update_budget_if(key, predicate, mutation)
    }

    fn iter_budgets(&self) -> Result<Vec<VoterBudget>, StoreError> {
        self.budgets.iter_budgets()
    }
}

impl GroupStore for LmdbStore {
    fn put_group(&self, group: &GroupMembership) -> Result<(), StoreError> {
        self.groups.put_group(group)
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<GroupMembership>, StoreError> {
        self.groups.get_group(id)
    }

    fn update_group_if(
        &self,
        id: &GroupId,
        predicate: Predicate<'_, GroupMembership>,
        mutation: Mutation<'_, GroupMembership>,
    ) -> Result<UpdateOutcome, StoreError> {
        self.groups.update_group_if(id, predicate, mutation)
    }

    fn iter_groups(&self) -> Result<Vec<GroupMembership>, StoreError> {
        self.groups.iter_groups()
    }
}
