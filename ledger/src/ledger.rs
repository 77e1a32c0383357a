//! The resource ledger: try-spend and refund over a [`BudgetStore`].

use std::sync::Arc;

use tally_store::BudgetStore;
use tally_types::{Clock, MeetingMemberId, VoterBudget};

use crate::LedgerError;

/// Atomic spend/refund operations on voter budgets.
pub struct ResourceLedger<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: BudgetStore> ResourceLedger<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Deduct `amount` votes if at least that many remain.
    ///
    /// Returns `Ok(true)` iff the deduction happened; a missing record or an
    /// insufficient balance is `Ok(false)`. The check and the deduction are
    /// one conditional update, never a read followed by a write.
    pub fn try_spend(&self, key: &MeetingMemberId, amount: u32) -> Result<bool, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let now = self.clock.now();
        let outcome = self.store.update_budget_if(
            key,
            &|budget: &VoterBudget| budget.votes_remaining >= amount,
            &|budget: &mut VoterBudget| {
                budget.votes_remaining -= amount;
                budget.updated_at = now;
            },
        )?;
        tracing::debug!(member = %key, amount, spent = outcome.applied, "budget spend");
        Ok(outcome.applied)
    }

    /// Spend a single vote.
    pub fn try_spend_one(&self, key: &MeetingMemberId) -> Result<bool, LedgerError> {
        self.try_spend(key, 1)
    }

    /// Return `amount` votes to a budget. Compensation only.
    ///
    /// Errors are returned to the caller, never retried here.
    pub fn refund(&self, key: &MeetingMemberId, amount: u32) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let now = self.clock.now();
        let outcome = self.store.update_budget_if(
            key,
            &|budget: &VoterBudget| budget.votes_remaining.checked_add(amount).is_some(),
            &|budget: &mut VoterBudget| {
                budget.votes_remaining += amount;
                budget.updated_at = now;
            },
        )?;
        if outcome.applied {
            tracing::debug!(member = %key, amount, "budget refunded");
            return Ok(());
        }
        match self.store.get_budget(key)? {
            None => Err(LedgerError::UnknownBudget(key.to_string())),
            Some(_) => Err(LedgerError::RefundOverflow {
                key: key.to_string(),
                amount,
            }),
        }
    }

    /// Refund a single vote.
    pub fn refund_one(&self, key: &MeetingMemberId) -> Result<(), LedgerError> {
        self.refund(key, 1)
    }

    /// Current balance, or `None` if the record does not exist.
    pub fn remaining(&self, key: &MeetingMemberId) -> Result<Option<u32>, LedgerError> {
        Ok(self.store.get_budget(key)?.map(|b| b.votes_remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_nullables::{NullClock, NullStore};
    use tally_types::{MeetingId, Timestamp, UserId};

    fn setup(votes: u32) -> (ResourceLedger<Arc<NullStore>>, MeetingMemberId) {
        let store = Arc::new(NullStore::new());
        let record = VoterBudget::new(
            MeetingId::new("m1").unwrap(),
            UserId::new("u1").unwrap(),
            votes,
            Timestamp::EPOCH,
        );
        store.put_budget(&record).unwrap();
        let ledger = ResourceLedger::new(store, Arc::new(NullClock::new(5_000)));
        (ledger, record.key())
    }

    #[test]
    fn spend_deducts_and_stamps() {
        let (ledger, key) = setup(2);
        assert!(ledger.try_spend_one(&key).unwrap());
        let stored = ledger.store().get_budget(&key).unwrap().unwrap();
        assert_eq!(stored.votes_remaining, 1);
        assert_eq!(stored.updated_at, Timestamp::from_millis(5_000));
    }

    #[test]
    fn spend_never_goes_below_zero() {
        let (ledger, key) = setup(1);
        assert!(ledger.try_spend_one(&key).unwrap());
        assert!(!ledger.try_spend_one(&key).unwrap());
        assert_eq!(ledger.remaining(&key).unwrap(), Some(0));
    }

    #[test]
    fn no_partial_deduction() {
        let (ledger, key) = setup(2);
        assert!(!ledger.try_spend(&key, 3).unwrap());
        assert_eq!(ledger.remaining(&key).unwrap(), Some(2));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let (ledger, key) = setup(2);
        assert!(matches!(ledger.try_spend(&key, 0), Err(LedgerError::ZeroAmount)));
        assert!(matches!(ledger.refund(&key, 0), Err(LedgerError::ZeroAmount)));
    }

    #[test]
    fn missing_record_is_false_not_error() {
        let (ledger, _) = setup(1);
        let other = MeetingMemberId::new(
            &MeetingId::new("m1").unwrap(),
            &UserId::new("ghost").unwrap(),
        );
        assert!(!ledger.try_spend_one(&other).unwrap());
        assert!(matches!(
            ledger.refund_one(&other),
            Err(LedgerError::UnknownBudget(_))
        ));
    }

    #[test]
    fn refund_restores_spent_vote() {
        let (ledger, key) = setup(1);
        assert!(ledger.try_spend_one(&key).unwrap());
        ledger.refund_one(&key).unwrap();
        assert_eq!(ledger.remaining(&key).unwrap(), Some(1));
    }

    #[test]
    fn refund_overflow_is_reported() {
        let (ledger, key) = setup(u32::MAX);
        assert!(matches!(
            ledger.refund_one(&key),
            Err(LedgerError::RefundOverflow { .. })
        ));
    }

    #[test]
    fn store_fault_propagates() {
        let (ledger, key) = setup(1);
        ledger.store().fail_budget_updates_after(0);
        assert!(matches!(
            ledger.try_spend_one(&key),
            Err(LedgerError::Storage(_))
        ));
    }
}
