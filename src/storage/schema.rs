//! Database schema definitions and migrations
//!
//! The schema only ever grows: columns missing from an older database are
//! added with `ALTER TABLE ADD COLUMN`. Dropped or renamed columns are not
//! handled.

use rusqlite::Connection;
use std::collections::HashSet;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per catalog page, keyed by canonical URL
CREATE TABLE IF NOT EXISTS manga_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL DEFAULT '',
    original_title TEXT,
    origin TEXT,
    release_year TEXT,
    work_type TEXT,
    genres TEXT,
    themes TEXT,
    author TEXT,
    translator TEXT,
    publisher_original TEXT,
    publisher_local TEXT,
    volume_count_original TEXT,
    volume_count_local TEXT,
    price TEXT,
    status TEXT NOT NULL DEFAULT 'unknown',
    volumes TEXT NOT NULL DEFAULT '{}',
    scraped_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Indexes, created once every column they cover exists
const INDEX_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_manga_records_work_type ON manga_records(work_type);
CREATE INDEX IF NOT EXISTS idx_manga_records_status ON manga_records(status);
CREATE INDEX IF NOT EXISTS idx_manga_records_created_at ON manga_records(created_at);
"#;

/// Columns of `manga_records` that may be missing from older databases,
/// with declarations `ALTER TABLE ADD COLUMN` accepts
const RECORD_COLUMNS: &[(&str, &str)] = &[
    ("title", "TEXT NOT NULL DEFAULT ''"),
    ("original_title", "TEXT"),
    ("origin", "TEXT"),
    ("release_year", "TEXT"),
    ("work_type", "TEXT"),
    ("genres", "TEXT"),
    ("themes", "TEXT"),
    ("author", "TEXT"),
    ("translator", "TEXT"),
    ("publisher_original", "TEXT"),
    ("publisher_local", "TEXT"),
    ("volume_count_original", "TEXT"),
    ("volume_count_local", "TEXT"),
    ("price", "TEXT"),
    ("status", "TEXT NOT NULL DEFAULT 'unknown'"),
    ("volumes", "TEXT NOT NULL DEFAULT '{}'"),
    ("scraped_at", "TEXT NOT NULL DEFAULT ''"),
    ("created_at", "TEXT NOT NULL DEFAULT ''"),
    ("updated_at", "TEXT NOT NULL DEFAULT ''"),
];

/// Initializes the database schema and applies additive migrations
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    let added = migrate_missing_columns(conn)?;
    if !added.is_empty() {
        tracing::info!("Added missing columns to manga_records: {}", added.join(", "));
    }
    conn.execute_batch(INDEX_SQL)?;
    Ok(())
}

/// Adds every expected column absent from `manga_records`
///
/// Returns the names of the columns that were added.
pub fn migrate_missing_columns(conn: &Connection) -> Result<Vec<&'static str>, rusqlite::Error> {
    let existing = table_columns(conn, "manga_records")?;
    let mut added = Vec::new();

    for (name, declaration) in RECORD_COLUMNS {
        if existing.contains(*name) {
            continue;
        }
        conn.execute_batch(&format!(
            "ALTER TABLE manga_records ADD COLUMN {} {}",
            name, declaration
        ))?;
        added.push(*name);
    }

    Ok(added)
}

fn table_columns(conn: &Connection, table: &str) -> Result<HashSet<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(columns)
}
