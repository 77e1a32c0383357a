//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tally_store::{BudgetStore, GroupStore, Mutation, Predicate, StoreError, UpdateOutcome};
use tally_types::{GroupId, GroupMembership, MeetingMemberId, VoterBudget};

/// An in-memory budget + group store for testing.
///
/// Conditional updates hold the map mutex across predicate and mutation, so
/// they are atomic like a real backend. On top of that the store can be
/// steered:
/// - [`NullStore::fail_budget_updates_after`] / [`NullStore::fail_group_updates_after`]
///   make conditional updates fault with `StoreError::Unavailable` once a
///   number of calls have succeeded.
/// - [`NullStore::force_group_outcome`] makes group updates report a fixed
///   outcome regardless of the predicate, simulating a drifted store.
pub struct NullStore {
    budgets: Mutex<BTreeMap<String, VoterBudget>>,
    groups: Mutex<BTreeMap<String, GroupMembership>>,
    budget_update_calls: AtomicUsize,
    group_update_calls: AtomicUsize,
    budget_fault_after: Mutex<Option<usize>>,
    group_fault_after: Mutex<Option<usize>>,
    forced_group_outcome: Mutex<Option<bool>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            budgets: Mutex::new(BTreeMap::new()),
            groups: Mutex::new(BTreeMap::new()),
            budget_update_calls: AtomicUsize::new(0),
            group_update_calls: AtomicUsize::new(0),
            budget_fault_after: Mutex::new(None),
            group_fault_after: Mutex::new(None),
            forced_group_outcome: Mutex::new(None),
        }
    }

    /// Let `calls` more budget updates succeed, then fault every later one.
    pub fn fail_budget_updates_after(&self, calls: usize) {
        let already = self.budget_update_calls.load(Ordering::SeqCst);
        *self.budget_fault_after.lock().unwrap() = Some(already + calls);
    }

    /// Let `calls` more group updates succeed, then fault every later one.
    pub fn fail_group_updates_after(&self, calls: usize) {
        let already = self.group_update_calls.load(Ordering::SeqCst);
        *self.group_fault_after.lock().unwrap() = Some(already + calls);
    }

    /// Stop injecting faults.
    pub fn heal(&self) {
        *self.budget_fault_after.lock().unwrap() = None;
        *self.group_fault_after.lock().unwrap() = None;
    }

    /// Report `outcome` for every group update. `Some(true)` applies the
    /// mutation even when the predicate fails; `Some(false)` never applies.
    pub fn force_group_outcome(&self, outcome: Option<bool>) {
        *self.forced_group_outcome.lock().unwrap() = outcome;
    }

    /// Number of conditional budget updates attempted.
    pub fn budget_update_calls(&self) -> usize {
        self.budget_update_calls.load(Ordering::SeqCst)
    }

    /// Number of conditional group updates attempted.
    pub fn group_update_calls(&self) -> usize {
        self.group_update_calls.load(Ordering::SeqCst)
    }

    fn check_fault(
        calls: &AtomicUsize,
        fault_after: &Mutex<Option<usize>>,
    ) -> Result<(), StoreError> {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        match *fault_after.lock().unwrap() {
            Some(limit) if call >= limit => Err(StoreError::Unavailable(
                "injected fault: store offline".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BudgetStore for NullStore {
    fn put_budget(&self, budget: &VoterBudget) -> Result<(), StoreError> {
        self.budgets
            .lock()
            .unwrap()
            .insert(budget.key().to_string(), budget.clone());
        Ok(())
    }

    fn get_budget(&self, key: &MeetingMemberId) -> Result<Option<VoterBudget>, StoreError> {
        Ok(self.budgets.lock().unwrap().get(&key.to_string()).cloned())
    }

    fn update_budget_if(
        &self,
        key: &MeetingMemberId,
        predicate: Predicate<'_, VoterBudget>,
        mutation: Mutation<'_, VoterBudget>,
    ) -> Result<UpdateOutcome, StoreError> {
        Self::check_fault(&self.budget_update_calls, &self.budget_fault_after)?;
        let mut budgets = self.budgets.lock().unwrap();
        let Some(budget) = budgets.get_mut(&key.to_string()) else {
            return Ok(UpdateOutcome::UNCHANGED);
        };
        if !predicate(budget) {
            return Ok(UpdateOutcome::UNCHANGED);
        }
        mutation(budget);
        Ok(UpdateOutcome::APPLIED)
    }

    fn iter_budgets(&self) -> Result<Vec<VoterBudget>, StoreError> {
        Ok(self.budgets.lock().unwrap().values().cloned().collect())
    }
}

impl GroupStore for NullStore {
    fn put_group(&self, group: &GroupMembership) -> Result<(), StoreError> {
        self.groups
            .lock()
            .unwrap()
            .insert(group.id.to_string(), group.clone());
        Ok(())
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<GroupMembership>, StoreError> {
        Ok(self.groups.lock().unwrap().get(id.as_str()).cloned())
    }

    fn update_group_if(
        &self,
        id: &GroupId,
        predicate: Predicate<'_, GroupMembership>,
        mutation: Mutation<'_, GroupMembership>,
    ) -> Result<UpdateOutcome, StoreError> {
        Self::check_fault(&self.group_update_calls, &self.group_fault_after)?;
        let forced = *self.forced_group_outcome.lock().unwrap();
        let mut groups = self.groups.lock().unwrap();
        let Some(group) = groups.get_mut(id.as_str()) else {
            return Ok(UpdateOutcome::UNCHANGED);
        };
        let apply = forced.unwrap_or_else(|| predicate(group));
        if apply {
            mutation(group);
        }
        Ok(UpdateOutcome::from_applied(apply))
    }

    fn iter_groups(&self) -> Result<Vec<GroupMembership>, StoreError> {
        Ok(self.groups.lock().unwrap().values().cloned().collect())
    }
}
