//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CatalogStore
//! trait. Collections are stored as JSON text; empty genre and theme lists
//! are stored as NULL and read back as empty lists.

use crate::record::{CanonicalRecord, PublicationStatus, StoredRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CatalogStore, StorageError, StorageResult};
use crate::storage::{ListQuery, Page, RecordUpdate, RunRecord, RunStatus, UpsertOutcome};
use crate::CatalogError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

const SELECT_RECORD: &str = "
    SELECT id, source_url, title, original_title, origin, release_year, work_type,
           genres, themes, author, translator, publisher_original, publisher_local,
           volume_count_original, volume_count_local, price, status, volumes,
           scraped_at, created_at, updated_at
    FROM manga_records";

/// Every field except `id` and `created_at` is overwritten on conflict
const UPSERT_RECORD: &str = "
    INSERT INTO manga_records (
        source_url, title, original_title, origin, release_year, work_type,
        genres, themes, author, translator, publisher_original, publisher_local,
        volume_count_original, volume_count_local, price, status, volumes,
        scraped_at, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
    ON CONFLICT(source_url) DO UPDATE SET
        title = excluded.title,
        original_title = excluded.original_title,
        origin = excluded.origin,
        release_year = excluded.release_year,
        work_type = excluded.work_type,
        genres = excluded.genres,
        themes = excluded.themes,
        author = excluded.author,
        translator = excluded.translator,
        publisher_original = excluded.publisher_original,
        publisher_local = excluded.publisher_local,
        volume_count_original = excluded.volume_count_original,
        volume_count_local = excluded.volume_count_local,
        price = excluded.price,
        status = excluded.status,
        volumes = excluded.volumes,
        scraped_at = excluded.scraped_at,
        updated_at = excluded.updated_at
    RETURNING id";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database file and brings its schema up to date
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn to_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    // Rows added by a column migration carry an empty timestamp
    if raw.is_empty() {
        return Ok(DateTime::<Utc>::default());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_json<T: DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn string_list_to_sql(values: &[String]) -> StorageResult<Option<String>> {
    if values.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(values)?))
    }
}

fn row_to_stored(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let genres: Option<String> = row.get(7)?;
    let themes: Option<String> = row.get(8)?;
    let status: String = row.get(16)?;
    let volumes: String = row.get(17)?;
    let scraped_at: String = row.get(18)?;
    let created_at: String = row.get(19)?;
    let updated_at: String = row.get(20)?;

    let record = CanonicalRecord {
        source_url: row.get(1)?,
        title: row.get(2)?,
        original_title: row.get(3)?,
        origin: row.get(4)?,
        release_year: row.get(5)?,
        work_type: row.get(6)?,
        genres: match genres {
            Some(raw) => parse_json(7, &raw)?,
            None => Vec::new(),
        },
        themes: match themes {
            Some(raw) => parse_json(8, &raw)?,
            None => Vec::new(),
        },
        author: row.get(9)?,
        translator: row.get(10)?,
        publisher_original: row.get(11)?,
        publisher_local: row.get(12)?,
        volume_count_original: row.get(13)?,
        volume_count_local: row.get(14)?,
        price: row.get(15)?,
        status: PublicationStatus::from_db_string(&status),
        volumes: parse_json(17, &volumes)?,
        scraped_at: parse_timestamp(18, &scraped_at)?,
    };

    Ok(StoredRecord {
        id: row.get(0)?,
        record,
        created_at: parse_timestamp(19, &created_at)?,
        updated_at: parse_timestamp(20, &updated_at)?,
    })
}

/// `%value%` with LIKE wildcards in `value` escaped by backslash
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// WHERE clause and positional parameters for the list filters
fn filter_clause(query: &ListQuery) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        conditions.push(
            "(title LIKE ? ESCAPE '\\' OR original_title LIKE ? ESCAPE '\\' OR author LIKE ? ESCAPE '\\')"
                .to_string(),
        );
        let pattern = like_pattern(search.trim());
        values.extend(std::iter::repeat(Value::Text(pattern)).take(3));
    }

    if let Some(work_type) = query.work_type.as_deref().filter(|s| !s.trim().is_empty()) {
        conditions.push("work_type LIKE ? ESCAPE '\\'".to_string());
        values.push(Value::Text(like_pattern(work_type.trim())));
    }

    for (column, wanted) in [("genres", &query.genres), ("themes", &query.themes)] {
        if wanted.is_empty() {
            continue;
        }
        let placeholders = vec!["?"; wanted.len()].join(", ");
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM json_each(manga_records.{}) WHERE json_each.value IN ({}))",
            column, placeholders
        ));
        values.extend(wanted.iter().cloned().map(Value::Text));
    }

    if let Some(status) = query.status {
        conditions.push("status = ?".to_string());
        values.push(Value::Text(status.as_str().to_string()));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

/// Applies an edited optional text field; blank input clears it
fn apply_text(slot: &mut Option<String>, edit: &Option<String>) {
    if let Some(value) = edit {
        let trimmed = value.trim();
        *slot = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
}

impl CatalogStore for SqliteStorage {
    // ===== Records =====

    fn upsert(&mut self, record: &CanonicalRecord) -> StorageResult<UpsertOutcome> {
        let genres = string_list_to_sql(&record.genres)?;
        let themes = string_list_to_sql(&record.themes)?;
        let volumes = serde_json::to_string(&record.volumes)?;
        let now = to_timestamp(&Utc::now());

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM manga_records WHERE source_url = ?1",
                params![record.source_url],
                |row| row.get(0),
            )
            .optional()?;

        let id: i64 = tx.query_row(
            UPSERT_RECORD,
            params![
                record.source_url,
                record.title,
                record.original_title,
                record.origin,
                record.release_year,
                record.work_type,
                genres,
                themes,
                record.author,
                record.translator,
                record.publisher_original,
                record.publisher_local,
                record.volume_count_original,
                record.volume_count_local,
                record.price,
                record.status.as_str(),
                volumes,
                to_timestamp(&record.scraped_at),
                now,
                now,
            ],
            |row| row.get(0),
        )?;

        tx.commit()?;

        Ok(UpsertOutcome {
            id,
            was_insert: existing.is_none(),
        })
    }

    fn find_by_id(&self, id: i64) -> StorageResult<Option<StoredRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_RECORD),
                params![id],
                row_to_stored,
            )
            .optional()?;
        Ok(record)
    }

    fn find_by_url(&self, source_url: &str) -> StorageResult<Option<StoredRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{} WHERE source_url = ?1", SELECT_RECORD),
                params![source_url],
                row_to_stored,
            )
            .optional()?;
        Ok(record)
    }

    fn list(&self, query: &ListQuery) -> StorageResult<Page<StoredRecord>> {
        let (where_clause, mut values) = filter_clause(query);

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM manga_records{}", where_clause),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        values.push(Value::Integer(i64::from(query.limit)));
        values.push(Value::Integer(
            i64::try_from(query.offset()).unwrap_or(i64::MAX),
        ));

        let mut stmt = self.conn.prepare(&format!(
            "{}{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            SELECT_RECORD, where_clause
        ))?;
        let items = stmt
            .query_map(params_from_iter(values.iter()), row_to_stored)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, query.page.max(1), query.limit, total as u64))
    }

    fn update_by_id(&mut self, id: i64, update: &RecordUpdate) -> StorageResult<StoredRecord> {
        let mut stored = self
            .find_by_id(id)?
            .ok_or_else(|| StorageError::NotFound(format!("Record ID {}", id)))?;
        let record = &mut stored.record;

        if let Some(title) = &update.title {
            record.title = title.trim().to_string();
        }
        apply_text(&mut record.original_title, &update.original_title);
        apply_text(&mut record.origin, &update.origin);
        apply_text(&mut record.release_year, &update.release_year);
        apply_text(&mut record.work_type, &update.work_type);
        apply_text(&mut record.author, &update.author);
        apply_text(&mut record.translator, &update.translator);
        apply_text(&mut record.publisher_original, &update.publisher_original);
        apply_text(&mut record.publisher_local, &update.publisher_local);
        apply_text(&mut record.volume_count_original, &update.volume_count_original);
        apply_text(&mut record.volume_count_local, &update.volume_count_local);
        apply_text(&mut record.price, &update.price);
        if let Some(genres) = &update.genres {
            record.genres = genres.clone();
        }
        if let Some(themes) = &update.themes {
            record.themes = themes.clone();
        }
        if let Some(status) = update.status {
            record.status = status;
        }

        self.conn.execute(
            "UPDATE manga_records SET
                title = ?1, original_title = ?2, origin = ?3, release_year = ?4,
                work_type = ?5, genres = ?6, themes = ?7, author = ?8, translator = ?9,
                publisher_original = ?10, publisher_local = ?11,
                volume_count_original = ?12, volume_count_local = ?13, price = ?14,
                status = ?15, updated_at = ?16
             WHERE id = ?17",
            params![
                record.title,
                record.original_title,
                record.origin,
                record.release_year,
                record.work_type,
                string_list_to_sql(&record.genres)?,
                string_list_to_sql(&record.themes)?,
                record.author,
                record.translator,
                record.publisher_original,
                record.publisher_local,
                record.volume_count_original,
                record.volume_count_local,
                record.price,
                record.status.as_str(),
                to_timestamp(&Utc::now()),
                id,
            ],
        )?;

        self.find_by_id(id)?
            .ok_or_else(|| StorageError::NotFound(format!("Record ID {}", id)))
    }

    fn delete_by_id(&mut self, id: i64) -> StorageResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM manga_records WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn delete_by_url(&mut self, source_url: &str) -> StorageResult<u64> {
        let deleted = self.conn.execute(
            "DELETE FROM manga_records WHERE source_url = ?1",
            params![source_url],
        )?;
        Ok(deleted as u64)
    }

    // ===== Statistics =====

    fn count_total(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM manga_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_type(&self) -> StorageResult<Vec<(Option<String>, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT work_type, COUNT(*) AS count
             FROM manga_records
             GROUP BY work_type
             ORDER BY count DESC, work_type",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn count_by_status(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) AS count
             FROM manga_records
             GROUP BY status
             ORDER BY count DESC, status",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = to_timestamp(&Utc::now());
        self.conn.execute(
            "INSERT INTO crawl_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = to_timestamp(&Utc::now());
        let updated = self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("Run ID {}", run_id)));
        }
        Ok(())
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status
                 FROM crawl_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Running),
                    })
                },
            )
            .optional()?;
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LabeledVolume, StandardVolume, VolumeSet};
    use chrono::TimeZone;

    const URL: &str = "https://www.nautiljon.com/mangas/gachiakuta.html";

    fn record(url: &str, title: &str) -> CanonicalRecord {
        CanonicalRecord {
            source_url: url.to_string(),
            title: title.to_string(),
            original_title: None,
            origin: Some("Japon".to_string()),
            release_year: None,
            work_type: Some("Shônen".to_string()),
            genres: vec!["Action".to_string()],
            themes: vec![],
            author: Some("URANA Kei".to_string()),
            translator: None,
            publisher_original: None,
            publisher_local: None,
            volume_count_original: Some("12 (En cours)".to_string()),
            volume_count_local: None,
            price: None,
            status: PublicationStatus::InProgress,
            volumes: VolumeSet::default(),
            scraped_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_upsert_insert_then_update() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let first = storage.upsert(&record(URL, "Gachiakuta")).unwrap();
        assert!(first.was_insert);
        assert!(first.id > 0);

        let second = storage.upsert(&record(URL, "Gachiakuta")).unwrap();
        assert!(!second.was_insert);
        assert_eq!(first.id, second.id);
        assert_eq!(storage.count_total().unwrap(), 1);
    }

    #[test]
    fn test_rescrape_replaces_all_fields() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let mut old = record(URL, "Old title");
        old.translator = Some("Someone".to_string());
        old.volumes.standard = (1..=3)
            .map(|number| StandardVolume {
                number,
                image_url: None,
            })
            .collect();
        old.volumes.special.push(LabeledVolume {
            label: "Fanbook".to_string(),
            image_url: None,
        });
        storage.upsert(&old).unwrap();
        let created_at = storage.find_by_url(URL).unwrap().unwrap().created_at;

        let mut new = record(URL, "New title");
        new.genres = vec!["Drame".to_string(), "Fantastique".to_string()];
        new.status = PublicationStatus::Completed;
        new.volumes.standard = vec![StandardVolume {
            number: 5,
            image_url: Some("https://www.nautiljon.com/images/5.jpg".to_string()),
        }];
        new.scraped_at = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        storage.upsert(&new).unwrap();

        let page = storage.list(&ListQuery::default()).unwrap();
        assert_eq!(page.total, 1);
        let stored = &page.items[0];
        assert_eq!(stored.record, new);
        assert_eq!(stored.created_at, created_at);
        assert!(stored.updated_at >= created_at);
    }

    #[test]
    fn test_empty_collections_stored_as_null() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut bare = record(URL, "Bare");
        bare.genres.clear();
        storage.upsert(&bare).unwrap();

        let (genres, themes): (Option<String>, Option<String>) = storage
            .conn
            .query_row("SELECT genres, themes FROM manga_records", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(genres, None);
        assert_eq!(themes, None);

        let stored = storage.find_by_url(URL).unwrap().unwrap();
        assert!(stored.record.genres.is_empty());
        assert!(stored.record.themes.is_empty());
    }

    #[test]
    fn test_find_missing() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.find_by_id(42).unwrap().is_none());
        assert!(storage.find_by_url(URL).unwrap().is_none());
    }

    #[test]
    fn test_list_filters() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let mut a = record("https://www.nautiljon.com/mangas/a.html", "Sakamoto Days");
        a.author = Some("SUZUKI Yûto".to_string());
        a.genres = vec!["Action".to_string(), "Comédie".to_string()];
        a.status = PublicationStatus::Completed;
        storage.upsert(&a).unwrap();

        let mut b = record("https://www.nautiljon.com/mangas/b.html", "Gachiakuta");
        b.work_type = Some("Seinen".to_string());
        b.themes = vec!["Dystopie".to_string()];
        storage.upsert(&b).unwrap();

        let search = |text: &str| ListQuery {
            search: Some(text.to_string()),
            ..Default::default()
        };
        assert_eq!(storage.list(&search("sakamoto")).unwrap().total, 1);
        assert_eq!(storage.list(&search("suzuki")).unwrap().total, 1);
        assert_eq!(storage.list(&search("%")).unwrap().total, 0);

        let by_type = ListQuery {
            work_type: Some("seinen".to_string()),
            ..Default::default()
        };
        assert_eq!(storage.list(&by_type).unwrap().items[0].record.title, "Gachiakuta");

        let by_genre = ListQuery {
            genres: vec!["Comédie".to_string(), "Horreur".to_string()],
            ..Default::default()
        };
        assert_eq!(storage.list(&by_genre).unwrap().total, 1);

        let by_theme = ListQuery {
            themes: vec!["Dystopie".to_string()],
            ..Default::default()
        };
        assert_eq!(storage.list(&by_theme).unwrap().items[0].record.title, "Gachiakuta");

        let by_status = ListQuery {
            status: Some(PublicationStatus::InProgress),
            ..Default::default()
        };
        assert_eq!(storage.list(&by_status).unwrap().total, 1);
    }

    #[test]
    fn test_list_pagination() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for i in 0..5 {
            let url = format!("https://www.nautiljon.com/mangas/{}.html", i);
            storage.upsert(&record(&url, &format!("Title {}", i))).unwrap();
        }

        let query = ListQuery {
            page: 3,
            limit: 2,
            ..Default::default()
        };
        let page = storage.list(&query).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 1);
        // Newest first
        assert_eq!(page.items[0].record.title, "Title 0");
    }

    #[test]
    fn test_update_by_id() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let outcome = storage.upsert(&record(URL, "Gachiakuta")).unwrap();

        let update = RecordUpdate {
            price: Some("7.20 €".to_string()),
            author: Some("".to_string()),
            themes: Some(vec!["Dystopie".to_string()]),
            ..Default::default()
        };
        let updated = storage.update_by_id(outcome.id, &update).unwrap();
        assert_eq!(updated.record.price.as_deref(), Some("7.20 €"));
        assert_eq!(updated.record.author, None);
        assert_eq!(updated.record.themes, vec!["Dystopie"]);
        assert_eq!(updated.record.title, "Gachiakuta");

        assert!(matches!(
            storage.update_by_id(999, &update),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let outcome = storage.upsert(&record(URL, "Gachiakuta")).unwrap();
        storage
            .upsert(&record("https://www.nautiljon.com/mangas/b.html", "B"))
            .unwrap();

        assert!(storage.delete_by_id(outcome.id).unwrap());
        assert!(!storage.delete_by_id(outcome.id).unwrap());
        assert_eq!(
            storage
                .delete_by_url("https://www.nautiljon.com/mangas/b.html")
                .unwrap(),
            1
        );
        assert_eq!(storage.delete_by_url(URL).unwrap(), 0);
        assert_eq!(storage.count_total().unwrap(), 0);
    }

    #[test]
    fn test_counts() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .upsert(&record("https://www.nautiljon.com/mangas/a.html", "A"))
            .unwrap();
        storage
            .upsert(&record("https://www.nautiljon.com/mangas/b.html", "B"))
            .unwrap();
        let mut c = record("https://www.nautiljon.com/mangas/c.html", "C");
        c.work_type = None;
        c.status = PublicationStatus::Unknown;
        storage.upsert(&c).unwrap();

        let by_type = storage.count_by_type().unwrap();
        assert_eq!(by_type[0], (Some("Shônen".to_string()), 2));
        assert_eq!(by_type[1], (None, 1));

        let by_status = storage.count_by_status().unwrap();
        assert_eq!(by_status[0], ("in_progress".to_string(), 2));
        assert_eq!(by_status[1], ("unknown".to_string(), 1));
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.latest_run().unwrap().is_none());

        let run_id = storage.create_run("test_hash").unwrap();
        assert!(run_id > 0);
        storage.finish_run(run_id, RunStatus::Completed).unwrap();

        let run = storage.latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.config_hash, "test_hash");
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());

        assert!(storage.finish_run(999, RunStatus::Failed).is_err());
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.upsert(&record(URL, "Gachiakuta")).unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        let stored = storage.find_by_url(URL).unwrap().unwrap();
        assert_eq!(stored.record.title, "Gachiakuta");
    }
}
