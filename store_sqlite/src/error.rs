use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid record {key}: {reason}")]
    InvalidRecord { key: String, reason: String },

    #[error("connection mutex poisoned")]
    LockPoisoned,

    #[error("database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },
}

impl SqliteError {
    /// Whether the failure is about reaching the database rather than about
    /// the data in it.
    pub fn is_unavailable(&self) -> bool {
        match self {
            SqliteError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
            ),
            SqliteError::LockPoisoned => true,
            _ => false,
        }
    }
}

impl From<SqliteError> for tally_store::StoreError {
    fn from(e: SqliteError) -> Self {
        use tally_store::StoreError;
        if e.is_unavailable() {
            return StoreError::Unavailable(e.to_string());
        }
        match e {
            SqliteError::Serialization(msg) => StoreError::Serialization(msg),
            SqliteError::InvalidRecord { .. } => StoreError::Corruption(e.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}
