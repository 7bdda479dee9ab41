//! Storage module for persisting catalog records
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and additive schema migrations
//! - Idempotent record upserts keyed by source URL
//! - Filtered, paginated listing and aggregate counts
//! - Crawl run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{CatalogStore, StorageError, StorageResult};

use crate::record::PublicationStatus;
use crate::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CatalogError> {
    SqliteStorage::new(path)
}

/// Locks a store shared between workers
///
/// A poisoned lock reports the store as unavailable.
pub fn lock_store<S>(store: &Mutex<S>) -> StorageResult<MutexGuard<'_, S>> {
    store
        .lock()
        .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))
}

/// Result of one upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    /// Row id of the stored record, stable across re-scrapes
    pub id: i64,

    /// True if the row was created, false if an existing row was overwritten
    pub was_insert: bool,
}

/// Filters and pagination for listing records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Case-insensitive substring of title, original title or author
    pub search: Option<String>,

    /// Case-insensitive substring of the work type
    pub work_type: Option<String>,

    /// Matches records sharing at least one of these genres
    pub genres: Vec<String>,

    /// Matches records sharing at least one of these themes
    pub themes: Vec<String>,

    pub status: Option<PublicationStatus>,

    /// 1-based page number
    pub page: u32,

    pub limit: u32,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 20;

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            work_type: None,
            genres: Vec::new(),
            themes: Vec::new(),
            status: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ListQuery {
    /// Row offset of the first item on the requested page
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.limit)
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };

        Self {
            items,
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// Partial update of the editable fields of a stored record
///
/// `None` leaves a field untouched. An empty string clears an optional
/// field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordUpdate {
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub origin: Option<String>,
    pub release_year: Option<String>,
    pub work_type: Option<String>,
    pub genres: Option<Vec<String>>,
    pub themes: Option<Vec<String>>,
    pub author: Option<String>,
    pub translator: Option<String>,
    pub publisher_original: Option<String>,
    pub publisher_local: Option<String>,
    pub volume_count_original: Option<String>,
    pub volume_count_local: Option<String>,
    pub price: Option<String>,
    pub status: Option<PublicationStatus>,
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
