//! LMDB implementation of GroupStore.

use heed::types::Bytes;
use heed::{Database, Env};

use tally_store::{GroupStore, Mutation, Predicate, StoreError, UpdateOutcome};
use tally_types::{GroupId, GroupMembership};

use crate::environment::{get_record, iter_records, put_record, update_record_if};

#[derive(Clone)]
pub struct LmdbGroupStore {
    pub(crate) env: Env,
    pub(crate) groups_db: Database<Bytes, Bytes>,
}

impl GroupStore for LmdbGroupStore {
    fn put_group(&self, group: &GroupMembership) -> Result<(), StoreError> {
        put_record(&self.env, &self.groups_db, group.id.as_str(), group)?;
        Ok(())
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<GroupMembership>, StoreError> {
        Ok(get_record(&self.env, &self.groups_db, id.as_str())?)
    }

    fn update_group_if(
        &self,
        id: &GroupId,
        predicate: Predicate<'_, GroupMembership>,
        mutation: Mutation<'_, GroupMembership>,
    ) -> Result<UpdateOutcome, StoreError> {
        Ok(update_record_if(
            &self.env,
            &self.groups_db,
            id.as_str(),
            predicate,
            mutation,
        )?)
    }

    fn iter_groups(&self) -> Result<Vec<GroupMembership>, StoreError> {
        Ok(iter_records(&self.env, &self.groups_db)?)
    }
}
