//! LMDB implementation of BudgetStore.

use heed::types::Bytes;
use heed::{Database, Env};

use tally_store::{BudgetStore, Mutation, Predicate, StoreError, UpdateOutcome};
use tally_types::{MeetingMemberId, VoterBudget};

use crate::environment::{get_record, iter_records, put_record, update_record_if};

#[derive(Clone)]
pub struct LmdbBudgetStore {
    pub(crate) env: Env,
    pub(crate) budgets_db: Database<Bytes, Bytes>,
}

impl BudgetStore for LmdbBudgetStore {
    fn put_budget(&self, budget: &VoterBudget) -> Result<(), StoreError> {
        put_record(&self.env, &self.budgets_db, &budget.key().to_string(), budget)?;
        Ok(())
    }

    fn get_budget(&self, key: &MeetingMemberId) -> Result<Option<VoterBudget>, StoreError> {
        Ok(get_record(&self.env, &self.budgets_db, &key.to_string())?)
    }

    fn update_budget_if(
        &self,
        key: &MeetingMemberId,
        predicate: Predicate<'_, VoterBudget>,
        mutation: Mutation<'_, VoterBudget>,
    ) -> Result<UpdateOutcome, StoreError> {
        Ok(update_record_if(
            &self.env,
            &self.budgets_db,
            &key.to_string(),
            predicate,
            mutation,
        )?)
    }

    fn iter_budgets(&self) -> Result<Vec<VoterBudget>, StoreError> {
        Ok(iter_records(&self.env, &self.budgets_db)?)
    }
}
