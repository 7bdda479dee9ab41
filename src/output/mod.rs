//! Output module for crawl reports and catalog listings
//!
//! This module handles:
//! - Rendering crawl reports for the terminal
//! - Rendering pages of stored records
//! - Loading and printing catalog statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, CatalogStatistics, StatusCount, TypeCount};

use crate::crawler::CrawlReport;
use crate::record::StoredRecord;
use crate::state::CrawlState;
use crate::storage::Page;
use std::fmt::Write;

/// Renders a crawl report, one line per requested URL followed by totals
pub fn render_crawl_report(report: &CrawlReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Report ===\n");

    for entry in &report.urls {
        let outcome = &entry.outcome;
        let _ = write!(
            out,
            "  [{}] {} (attempts: {})",
            outcome.state, entry.requested_url, outcome.attempts
        );

        if let Some(upsert) = outcome.upsert {
            let action = if upsert.was_insert { "inserted" } else { "updated" };
            let _ = write!(out, " -> record {} {}", upsert.id, action);
        }
        if entry.shared {
            out.push_str(" (shared)");
        }
        if let Some(error) = &outcome.error {
            let _ = write!(out, ": {}", error);
        }
        if !outcome.warnings.is_empty() {
            let _ = write!(out, " [{} warnings]", outcome.warnings.len());
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "\nSummary: {} requested, {} done ({} inserted, {} updated), {} abandoned, {} rejected, {} interrupted",
        report.urls.len(),
        report.count_in(CrawlState::Done),
        report.inserted(),
        report.updated(),
        report.count_in(CrawlState::Abandoned),
        report.count_in(CrawlState::Rejected),
        report.count_in(CrawlState::Interrupted)
    );
    let _ = writeln!(out, "Elapsed: {:.2}s", report.elapsed.as_secs_f64());
    out
}

/// Renders one page of a listing as an aligned table
pub fn render_record_page(page: &Page<StoredRecord>) -> String {
    let mut out = String::new();
    if page.items.is_empty() {
        let _ = writeln!(out, "No records found.");
    } else {
        let _ = writeln!(out, "{:>6}  {:<40}  {:<12}  {:<11}", "ID", "TITLE", "TYPE", "STATUS");
        for stored in &page.items {
            let record = &stored.record;
            let _ = writeln!(
                out,
                "{:>6}  {:<40}  {:<12}  {:<11}",
                stored.id,
                truncate(&record.title, 40),
                truncate(record.work_type.as_deref().unwrap_or("-"), 12),
                record.status
            );
        }
    }

    let _ = writeln!(
        out,
        "\nPage {} of {} ({} records)",
        page.page,
        page.total_pages.max(1),
        page.total
    );
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}
