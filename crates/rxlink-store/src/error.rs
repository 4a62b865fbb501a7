use std::path::PathBuf;

use rxlink_model::{ModelError, StoreError};
use thiserror::Error;

/// Failure while loading, importing, or opening a catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog not found: {path}")]
    Missing { path: PathBuf },

    #[error("failed to parse CSV {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("invalid catalog row {line} in {path}: {message}")]
    InvalidRow {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("duplicate medicine id {id} in catalog")]
    DuplicateId { id: i64 },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("catalog connection is unusable: {message}")]
    Connection { message: String },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Map a SQLite failure during a lookup onto the store contract.
pub(crate) fn store_error(error: &rusqlite::Error) -> StoreError {
    match error {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::OperationInterrupted =>
        {
            StoreError::Timeout
        }
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::NotADatabase
            ) =>
        {
            StoreError::unavailable(error.to_string())
        }
        _ => StoreError::query(error.to_string()),
    }
}
