//! Storage traits and error types
//!
//! This module defines the trait interface for catalog storage backends and
//! the associated error taxonomy.

use crate::record::{CanonicalRecord, StoredRecord};
use crate::storage::{ListQuery, Page, RecordUpdate, RunRecord, RunStatus, UpsertOutcome};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached or is busy; the operation may succeed
    /// if retried
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl StorageError {
    /// Returns true if the failed operation is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::SqliteFailure(failure, _) => Some(failure.code),
            _ => None,
        };

        match code {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure,
            ) => Self::Unavailable(err.to_string()),
            Some(ErrorCode::ConstraintViolation) => Self::ConstraintViolation(err.to_string()),
            _ => Self::Sqlite(err),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for catalog storage backend implementations
///
/// Records are keyed by their canonical source URL; at most one stored
/// record exists per URL.
pub trait CatalogStore {
    // ===== Records =====

    /// Inserts the record, or overwrites every field of the record stored
    /// under the same source URL except its id and creation time
    fn upsert(&mut self, record: &CanonicalRecord) -> StorageResult<UpsertOutcome>;

    fn find_by_id(&self, id: i64) -> StorageResult<Option<StoredRecord>>;

    fn find_by_url(&self, source_url: &str) -> StorageResult<Option<StoredRecord>>;

    /// Lists records matching the query filters, newest first
    fn list(&self, query: &ListQuery) -> StorageResult<Page<StoredRecord>>;

    /// Applies a partial update to an existing record
    ///
    /// Fails with [`StorageError::NotFound`] when no record has this id.
    fn update_by_id(&mut self, id: i64, update: &RecordUpdate) -> StorageResult<StoredRecord>;

    /// Returns true if a record was deleted
    fn delete_by_id(&mut self, id: i64) -> StorageResult<bool>;

    /// Returns the number of deleted records
    fn delete_by_url(&mut self, source_url: &str) -> StorageResult<u64>;

    // ===== Statistics =====

    fn count_total(&self) -> StorageResult<u64>;

    /// Record counts grouped by work type, largest group first
    fn count_by_type(&self) -> StorageResult<Vec<(Option<String>, u64)>>;

    /// Record counts grouped by publication status, largest group first
    fn count_by_status(&self) -> StorageResult<Vec<(String, u64)>>;

    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Sets the final status and finish timestamp of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
