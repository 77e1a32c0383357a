//! LMDB environment setup and the shared conditional-update routine.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;

use tally_store::{Mutation, Predicate, UpdateOutcome};

use crate::integrity::{check_data_dir, check_integrity};
use crate::migration::Migrator;
use crate::{LmdbBudgetStore, LmdbError, LmdbGroupStore, LmdbMetaStore, LmdbStore};

/// Number of named databases in the environment.
const MAX_DBS: u32 = 4;

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

pub(crate) const BUDGETS_DB: &str = "budgets";
pub(crate) const GROUPS_DB: &str = "groups";
pub(crate) const META_DB: &str = "meta";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Env,
    budgets_db: Database<Bytes, Bytes>,
    groups_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, create the
    /// databases, run schema migrations, and check integrity.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        check_data_dir(path).map_err(LmdbError::Integrity)?;
        std::fs::create_dir_all(path)?;

        // SAFETY: each environment path is opened once per process; the
        // daemon and tests never open the same directory twice concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let budgets_db = env.create_database(&mut wtxn, Some(BUDGETS_DB))?;
        let groups_db = env.create_database(&mut wtxn, Some(GROUPS_DB))?;
        let meta_db = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        let environment = Self {
            env,
            budgets_db,
            groups_db,
            meta_db,
        };

        Migrator::run(&environment.meta_store())?;

        let report = check_integrity(&environment.env)?;
        if !report.is_healthy() {
            return Err(LmdbError::Integrity(report.errors.join("; ")));
        }
        tracing::info!(
            path = %path.display(),
            databases = report.databases_checked,
            entries = report.total_entries,
            "LMDB environment opened"
        );

        Ok(environment)
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn budget_store(&self) -> LmdbBudgetStore {
        LmdbBudgetStore {
            env: self.env.clone(),
            budgets_db: self.budgets_db,
        }
    }

    pub fn group_store(&self) -> LmdbGroupStore {
        LmdbGroupStore {
            env: self.env.clone(),
            groups_db: self.groups_db,
        }
    }

    /// Budgets and groups together, as the voting path uses them.
    pub fn store(&self) -> LmdbStore {
        LmdbStore::new(self.budget_store(), self.group_store())
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: self.env.clone(),
            meta_db: self.meta_db,
        }
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    bincode::serialize(value).map_err(|e| LmdbError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    bincode::deserialize(bytes).map_err(|e| LmdbError::Serialization(e.to_string()))
}

pub(crate) fn put_record<T: Serialize>(
    env: &Env,
    db: &Database<Bytes, Bytes>,
    key: &str,
    value: &T,
) -> Result<(), LmdbError> {
    let bytes = encode(value)?;
    let mut wtxn = env.write_txn()?;
    db.put(&mut wtxn, key.as_bytes(), bytes.as_slice())?;
    wtxn.commit()?;
    Ok(())
}

pub(crate) fn get_record<T: DeserializeOwned>(
    env: &Env,
    db: &Database<Bytes, Bytes>,
    key: &str,
) -> Result<Option<T>, LmdbError> {
    let rtxn = env.read_txn()?;
    match db.get(&rtxn, key.as_bytes())? {
        Some(bytes) => Ok(Some(decode(bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn iter_records<T: DeserializeOwned>(
    env: &Env,
    db: &Database<Bytes, Bytes>,
) -> Result<Vec<T>, LmdbError> {
    let rtxn = env.read_txn()?;
    let mut records = Vec::new();
    for result in db.iter(&rtxn)? {
        let (_key, val) = result?;
        records.push(decode(val)?);
    }
    Ok(records)
}

/// Read, test, and rewrite one record inside a single write transaction.
///
/// Dropping the transaction without committing aborts it, so every early
/// return leaves the record untouched.
pub(crate) fn update_record_if<T: Serialize + DeserializeOwned>(
    env: &Env,
    db: &Database<Bytes, Bytes>,
    key: &str,
    predicate: Predicate<'_, T>,
    mutation: Mutation<'_, T>,
) -> Result<UpdateOutcome, LmdbError> {
    let mut wtxn = env.write_txn()?;
    let current: T = match db.get(&wtxn, key.as_bytes())? {
        Some(bytes) => decode(bytes)?,
        None => return Ok(UpdateOutcome::UNCHANGED),
    };
    if !predicate(&current) {
        return Ok(UpdateOutcome::UNCHANGED);
    }
    let mut next = current;
    mutation(&mut next);
    let bytes = encode(&next)?;
    db.put(&mut wtxn, key.as_bytes(), bytes.as_slice())?;
    wtxn.commit()?;
    Ok(UpdateOutcome::APPLIED)
}
