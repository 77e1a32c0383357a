//! SQLite implementation of BudgetStore, GroupStore, and MetaStore.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use tally_store::{
    BudgetStore, GroupStore, MetaStore, Mutation, Predicate, StoreError, UpdateOutcome,
};
use tally_types::{
    GroupId, GroupMembership, MeetingId, MeetingMemberId, Timestamp, UserId, VoterBudget,
};

use crate::schema::{migrate, read_schema_version, write_schema_version};
use crate::SqliteError;

/// How long a writer waits for the database lock before reporting busy.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Relational store over one SQLite connection.
///
/// The connection sits behind a mutex; clones share it.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and migrate it.
    pub fn open(path: &Path) -> Result<Self, SqliteError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, SqliteError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, SqliteError> {
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteError> {
        self.conn.lock().map_err(|_| SqliteError::LockPoisoned)
    }
}

// ── Row mapping ────────────────────────────────────────────────────────

fn invalid(key: &str, reason: impl ToString) -> SqliteError {
    SqliteError::InvalidRecord {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn load_budget(conn: &Connection, key: &str) -> Result<Option<VoterBudget>, SqliteError> {
    let row: Option<(String, String, i64, i64)> = conn
        .query_row(
            "SELECT meeting_id, user_id, votes_remaining, updated_at \
             FROM meeting_members WHERE id = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;
    row.map(|(meeting, user, votes, updated_at)| {
        budget_from_row(key, meeting, user, votes, updated_at)
    })
    .transpose()
}

fn budget_from_row(
    key: &str,
    meeting: String,
    user: String,
    votes: i64,
    updated_at: i64,
) -> Result<VoterBudget, SqliteError> {
    Ok(VoterBudget {
        meeting_id: MeetingId::new(meeting).map_err(|e| invalid(key, e))?,
        user_id: UserId::new(user).map_err(|e| invalid(key, e))?,
        votes_remaining: u32::try_from(votes).map_err(|e| invalid(key, e))?,
        updated_at: Timestamp::from_millis(updated_at.max(0) as u64),
    })
}

fn save_budget(conn: &Connection, budget: &VoterBudget) -> Result<(), SqliteError> {
    conn.execute(
        "INSERT INTO meeting_members (id, meeting_id, user_id, votes_remaining, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(id) DO UPDATE SET \
            votes_remaining = excluded.votes_remaining, \
            updated_at = excluded.updated_at",
        params![
            budget.key().to_string(),
            budget.meeting_id.as_str(),
            budget.user_id.as_str(),
            i64::from(budget.votes_remaining),
            budget.updated_at.as_millis() as i64,
        ],
    )?;
    Ok(())
}

fn load_group(conn: &Connection, id: &str) -> Result<Option<GroupMembership>, SqliteError> {
    let row: Option<(String, String, i64)> = conn
        .query_row(
            "SELECT meeting_id, voter_ids, updated_at FROM reflection_groups WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    row.map(|(meeting, voters, updated_at)| group_from_row(id, meeting, &voters, updated_at))
        .transpose()
}

fn group_from_row(
    id: &str,
    meeting: String,
    voters: &str,
    updated_at: i64,
) -> Result<GroupMembership, SqliteError> {
    let voter_ids: Vec<UserId> =
        serde_json::from_str(voters).map_err(|e| SqliteError::Serialization(e.to_string()))?;
    Ok(GroupMembership {
        id: GroupId::new(id).map_err(|e| invalid(id, e))?,
        meeting_id: MeetingId::new(meeting).map_err(|e| invalid(id, e))?,
        voter_ids,
        updated_at: Timestamp::from_millis(updated_at.max(0) as u64),
    })
}

fn save_group(conn: &Connection, group: &GroupMembership) -> Result<(), SqliteError> {
    let voters = serde_json::to_string(&group.voter_ids)
        .map_err(|e| SqliteError::Serialization(e.to_string()))?;
    conn.execute(
        "INSERT INTO reflection_groups (id, meeting_id, voter_ids, updated_at) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(id) DO UPDATE SET \
            voter_ids = excluded.voter_ids, \
            updated_at = excluded.updated_at",
        params![
            group.id.as_str(),
            group.meeting_id.as_str(),
            voters,
            group.updated_at.as_millis() as i64,
        ],
    )?;
    Ok(())
}

// ── Trait impls ────────────────────────────────────────────────────────

impl BudgetStore for SqliteStore {
    fn put_budget(&self, budget: &VoterBudget) -> Result<(), StoreError> {
        let conn = self.lock()?;
        save_budget(&conn, budget)?;
        Ok(())
    }

    fn get_budget(&self, key: &MeetingMemberId) -> Result<Option<VoterBudget>, StoreError> {
        let conn = self.lock()?;
        Ok(load_budget(&conn, &key.to_string())?)
    }

    fn update_budget_if(
        &self,
        key: &MeetingMemberId,
        predicate: Predicate<'_, VoterBudget>,
        mutation: Mutation<'_, VoterBudget>,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SqliteError::from)?;
        let Some(mut budget) = load_budget(&tx, &key.to_string())? else {
            return Ok(UpdateOutcome::UNCHANGED);
        };
        if !predicate(&budget) {
            return Ok(UpdateOutcome::UNCHANGED);
        }
        mutation(&mut budget);
        save_budget(&tx, &budget)?;
        tx.commit().map_err(SqliteError::from)?;
        Ok(UpdateOutcome::APPLIED)
    }

    fn iter_budgets(&self) -> Result<Vec<VoterBudget>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, meeting_id, user_id, votes_remaining, updated_at \
                 FROM meeting_members ORDER BY id",
            )
            .map_err(SqliteError::from)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .map_err(SqliteError::from)?;
        let mut budgets = Vec::new();
        for row in rows {
            let (key, meeting, user, votes, updated_at) = row.map_err(SqliteError::from)?;
            budgets.push(budget_from_row(&key, meeting, user, votes, updated_at)?);
        }
        Ok(budgets)
    }
}

impl GroupStore for SqliteStore {
    fn put_group(&self, group: &GroupMembership) -> Result<(), StoreError> {
        let conn = self.lock()?;
        save_group(&conn, group)?;
        Ok(())
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<GroupMembership>, StoreError> {
        let conn = self.lock()?;
        Ok(load_group(&conn, id.as_str())?)
    }

    fn update_group_if(
        &self,
        id: &GroupId,
        predicate: Predicate<'_, GroupMembership>,
        mutation: Mutation<'_, GroupMembership>,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SqliteError::from)?;
        let Some(mut group) = load_group(&tx, id.as_str())? else {
            return Ok(UpdateOutcome::UNCHANGED);
        };
        if !predicate(&group) {
            return Ok(UpdateOutcome::UNCHANGED);
        }
        mutation(&mut group);
        save_group(&tx, &group)?;
        tx.commit().map_err(SqliteError::from)?;
        Ok(UpdateOutcome::APPLIED)
    }

    fn iter_groups(&self) -> Result<Vec<GroupMembership>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, meeting_id, voter_ids, updated_at \
                 FROM reflection_groups ORDER BY id",
            )
            .map_err(SqliteError::from)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(SqliteError::from)?;
        let mut groups = Vec::new();
        for row in rows {
            let (id, meeting, voters, updated_at) = row.map_err(SqliteError::from)?;
            groups.push(group_from_row(&id, meeting, &voters, updated_at)?);
        }
        Ok(groups)
    }
}

impl MetaStore for SqliteStore {
    fn get_schema_version(&self) -> Result<u32, StoreError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        let conn = self.lock()?;
        write_schema_version(&conn, version)?;
        Ok(())
    }
}
