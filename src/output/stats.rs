//! Statistics generation from the catalog database
//!
//! This module provides functionality for extracting and displaying
//! catalog statistics from the storage layer.

use crate::storage::{CatalogStore, RunRecord, StorageResult};
use serde::Serialize;

/// Number of records sharing one work type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    /// `None` for records without a type
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    pub count: u64,
}

/// Number of records sharing one publication status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

/// Catalog statistics summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatistics {
    /// Total number of stored records
    pub total: u64,

    /// Records by work type, largest group first
    pub by_type: Vec<TypeCount>,

    /// Records by publication status, largest group first
    pub by_status: Vec<StatusCount>,

    /// Most recent crawl run, if any
    #[serde(skip)]
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
pub fn load_statistics(storage: &dyn CatalogStore) -> StorageResult<CatalogStatistics> {
    let by_type = storage
        .count_by_type()?
        .into_iter()
        .map(|(work_type, count)| TypeCount { work_type, count })
        .collect();

    let by_status = storage
        .count_by_status()?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();

    Ok(CatalogStatistics {
        total: storage.count_total()?,
        by_type,
        by_status,
        latest_run: storage.latest_run()?,
    })
}

fn percentage(count: u64, total: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total);
    println!();

    if !stats.by_type.is_empty() {
        println!("Records by Type:");
        for entry in &stats.by_type {
            println!(
                "  {}: {} ({:.1}%)",
                entry.work_type.as_deref().unwrap_or("(none)"),
                entry.count,
                percentage(entry.count, stats.total)
            );
        }
        println!();
    }

    if !stats.by_status.is_empty() {
        println!("Records by Status:");
        for entry in &stats.by_status {
            println!(
                "  {}: {} ({:.1}%)",
                entry.status,
                entry.count,
                percentage(entry.count, stats.total)
            );
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => println!(
            "Latest Run: #{} {} (started {}, finished {})",
            run.id,
            run.status.to_db_string(),
            run.started_at,
            run.finished_at.as_deref().unwrap_or("-")
        ),
        None => println!("Latest Run: none"),
    }
}
