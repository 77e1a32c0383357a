//! Voter budget storage trait.

use crate::{Mutation, Predicate, StoreError, UpdateOutcome};
use tally_types::{MeetingMemberId, VoterBudget};

/// Trait for voter budget storage operations.
pub trait BudgetStore: Send + Sync {
    /// Insert or replace a budget record. Used for seeding, not for spending.
    fn put_budget(&self, budget: &VoterBudget) -> Result<(), StoreError>;

    fn get_budget(&self, key: &MeetingMemberId) -> Result<Option<VoterBudget>, StoreError>;

    /// Atomically apply `mutation` to the record under `key` if `predicate`
    /// holds for its current value.
    fn update_budget_if(
        &self,
        key: &MeetingMemberId,
        predicate: Predicate<'_, VoterBudget>,
        mutation: Mutation<'_, VoterBudget>,
    ) -> Result<UpdateOutcome, StoreError>;

    /// All budget records, in key order.
    fn iter_budgets(&self) -> Result<Vec<VoterBudget>, StoreError>;
}

impl<T: BudgetStore + ?Sized> BudgetStore for std::sync::Arc<T> {
    fn put_budget(&self, budget: &VoterBudget) -> Result<(), StoreError> {
        (**self).put_budget(budget)
    }

    fn get_budget(&self, key: &MeetingMemberId) -> Result<Option<VoterBudget>, StoreError> {
        (**self).get_budget(key)
    }

    fn update_budget_if(
        &self,
        key: &MeetingMemberId,
        predicate: Predicate<'_, VoterBudget>,
        mutation: Mutation<'_, VoterBudget>,
    ) -> Result<UpdateOutcome, StoreError> {
        (**self).update_budget_if(key, predicate, mutation)
    }

    fn iter_budgets(&self) -> Result<Vec<VoterBudget>, StoreError> {
        (**self).iter_budgets()
    }
}
