//! Table definitions and schema migrations.

use rusqlite::{params, Connection, OptionalExtension};

use crate::SqliteError;

/// The schema version that the current code expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "schema_version";

const CREATE_META: &str = "CREATE TABLE IF NOT EXISTS schema_meta (\
     key TEXT PRIMARY KEY, \
     value INTEGER NOT NULL)";

const CREATE_TABLES_V1: &str = "\
    CREATE TABLE IF NOT EXISTS meeting_members (\
        id TEXT PRIMARY KEY, \
        meeting_id TEXT NOT NULL, \
        user_id TEXT NOT NULL, \
        votes_remaining INTEGER NOT NULL CHECK (votes_remaining >= 0), \
        updated_at INTEGER NOT NULL); \
    CREATE TABLE IF NOT EXISTS reflection_groups (\
        id TEXT PRIMARY KEY, \
        meeting_id TEXT NOT NULL, \
        voter_ids TEXT NOT NULL DEFAULT '[]', \
        updated_at INTEGER NOT NULL); \
    CREATE INDEX IF NOT EXISTS idx_reflection_groups_meeting \
        ON reflection_groups(meeting_id);";

pub(crate) fn read_schema_version(conn: &Connection) -> Result<u32, SqliteError> {
    let version: Option<i64> = conn
        .query_row(
            "SELECT value FROM schema_meta WHERE key = ?1",
            params![SCHEMA_VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version.unwrap_or(0) as u32)
}

pub(crate) fn write_schema_version(conn: &Connection, version: u32) -> Result<(), SqliteError> {
    conn.execute(
        "INSERT INTO schema_meta (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![SCHEMA_VERSION_KEY, i64::from(version)],
    )?;
    Ok(())
}

/// Create the meta table and bring the schema up to
/// [`CURRENT_SCHEMA_VERSION`]. Refuses databases written by a newer build.
pub fn migrate(conn: &Connection) -> Result<(), SqliteError> {
    conn.execute(CREATE_META, [])?;
    let current = read_schema_version(conn)?;

    if current == CURRENT_SCHEMA_VERSION {
        tracing::debug!(version = current, "relational store schema is up to date");
        return Ok(());
    }
    if current > CURRENT_SCHEMA_VERSION {
        return Err(SqliteError::SchemaTooNew {
            found: current,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    for version in current..CURRENT_SCHEMA_VERSION {
        tracing::info!(from = version, to = version + 1, "running migration");
        run_migration(conn, version + 1)?;
    }
    write_schema_version(conn, CURRENT_SCHEMA_VERSION)?;
    Ok(())
}

fn run_migration(conn: &Connection, to: u32) -> Result<(), SqliteError> {
    match to {
        1 => {
            conn.execute_batch(CREATE_TABLES_V1)?;
            Ok(())
        }
        other => Err(SqliteError::Serialization(format!(
            "unknown migration target {other}"
        ))),
    }
}
