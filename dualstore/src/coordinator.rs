//! The dual-store coordinator.

use std::sync::Arc;

use tally_store::{
    AlertSink, ConsistencyAlert, GroupStore, Mutation, Predicate, StoreError, StoreRole,
    UpdateOutcome,
};
use tally_types::{GroupId, GroupMembership};

use crate::CoordinatorError;

/// Authoritative store `A` plus shadow store `B` for group records.
///
/// Reads go to `A` only. Seeding writes go to both, `A` first. Conditional
/// updates run on both sides concurrently and return `A`'s outcome.
///
/// Budgets are not mirrored. The ledger runs against the authoritative
/// store alone.
pub struct DualStoreCoordinator<A, B> {
    authoritative: A,
    shadow: B,
    alerts: Arc<dyn AlertSink>,
}

impl<A, B> DualStoreCoordinator<A, B> {
    pub fn new(authoritative: A, shadow: B, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            authoritative,
            shadow,
            alerts,
        }
    }

    pub fn authoritative(&self) -> &A {
        &self.authoritative
    }

    pub fn shadow(&self) -> &B {
        &self.shadow
    }

    pub fn alerts(&self) -> &Arc<dyn AlertSink> {
        &self.alerts
    }

    /// Run `on_a` and `on_b` in parallel and reconcile their outcomes.
    pub fn run_conditional<FA, FB>(
        &self,
        operation: &str,
        key: &str,
        on_a: FA,
        on_b: FB,
    ) -> Result<bool, CoordinatorError>
    where
        FA: FnOnce() -> Result<UpdateOutcome, StoreError> + Send,
        FB: FnOnce() -> Result<UpdateOutcome, StoreError> + Send,
    {
        let (a, b) = rayon::join(on_a, on_b);
        match (a, b) {
            (Ok(a), Ok(b)) => {
                if a.applied != b.applied {
                    tracing::warn!(
                        operation,
                        key,
                        authoritative = a.applied,
                        shadow = b.applied,
                        "store outcomes diverged"
                    );
                    self.alerts.report(ConsistencyAlert::OutcomeMismatch {
                        operation: operation.to_string(),
                        key: key.to_string(),
                        authoritative: a.applied,
                        shadow: b.applied,
                    });
                }
                Ok(a.applied)
            }
            (Ok(a), Err(e)) => {
                if a.applied {
                    self.report_partial(operation, key, StoreRole::Authoritative, &e);
                }
                Err(CoordinatorError::shadow(e))
            }
            (Err(e), Ok(b)) => {
                if b.applied {
                    self.report_partial(operation, key, StoreRole::Shadow, &e);
                }
                Err(CoordinatorError::authoritative(e))
            }
            (Err(ea), Err(eb)) => {
                tracing::warn!(operation, key, shadow_error = %eb, "both stores failed");
                Err(CoordinatorError::authoritative(ea))
            }
        }
    }

    fn report_partial(&self, operation: &str, key: &str, applied_in: StoreRole, error: &StoreError) {
        let failed_in = match applied_in {
            StoreRole::Authoritative => StoreRole::Shadow,
            StoreRole::Shadow => StoreRole::Authoritative,
        };
        self.alerts.report(ConsistencyAlert::PartialWrite {
            operation: operation.to_string(),
            key: key.to_string(),
            applied_in,
            failed_in,
            error: error.to_string(),
        });
    }
}

impl<A: GroupStore, B: GroupStore> DualStoreCoordinator<A, B> {
    /// Conditional group update with the fault's side preserved.
    pub fn update_group_both(
        &self,
        id: &GroupId,
        predicate: Predicate<'_, GroupMembership>,
        mutation: Mutation<'_, GroupMembership>,
    ) -> Result<bool, CoordinatorError> {
        self.run_conditional(
            "update_group",
            id.as_str(),
            || self.authoritative.update_group_if(id, predicate, mutation),
            || self.shadow.update_group_if(id, predicate, mutation),
        )
    }
}

impl<A: GroupStore, B: GroupStore> GroupStore for DualStoreCoordinator<A, B> {
    fn put_group(&self, group: &GroupMembership) -> Result<(), StoreError> {
        self.authoritative
            .put_group(group)
            .map_err(CoordinatorError::authoritative)?;
        self.shadow.put_group(group).map_err(CoordinatorError::shadow)?;
        Ok(())
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<GroupMembership>, StoreError> {
        self.authoritative.get_group(id)
    }

    fn update_group_if(
        &self,
        id: &GroupId,
        predicate: Predicate<'_, GroupMembership>,
        mutation: Mutation<'_, GroupMembership>,
    ) -> Result<UpdateOutcome, StoreError> {
        let applied = self.update_group_both(id, predicate, mutation)?;
        Ok(UpdateOutcome::from_applied(applied))
    }

    fn iter_groups(&self) -> Result<Vec<GroupMembership>, StoreError> {
        self.authoritative.iter_groups()
    }
}
