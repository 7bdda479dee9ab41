//! Crawler module for catalog page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching bounded by per-attempt timeouts
//! - Page parsing into canonical records off the async runtime
//! - A shared work queue with retry backoff
//! - Single-flight deduplication of canonical URLs
//! - Overall crawl orchestration and reporting

mod coordinator;
mod fetcher;
mod parser;
mod registry;
mod report;
mod scheduler;

pub use coordinator::{CrawlSettings, Orchestrator};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher};
pub use parser::{parse_page, ParsedPage};
pub use report::{CrawlReport, UrlOutcome, UrlReport};
pub use scheduler::{QueuedUrl, RetryPolicy, Scheduler};

use crate::config::Config;
use crate::storage::{lock_store, open_storage, CatalogStore, RunStatus, StorageError};
use crate::CatalogError;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why one attempt at a URL did not produce a stored record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrawlError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction exceeded {0:?}")]
    ExtractionTimeout(Duration),

    #[error("Extraction panicked: {0}")]
    ExtractionPanicked(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Interrupted")]
    Interrupted,
}

impl CrawlError {
    /// Returns true if a later attempt may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_)
                | Self::ExtractionTimeout(_)
                | Self::ExtractionPanicked(_)
                | Self::StoreUnavailable(_)
        )
    }
}

impl From<StorageError> for CrawlError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StorageError::ConstraintViolation(msg) => Self::ConstraintViolation(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for the `crawl` command. It will:
/// 1. Open the catalog database
/// 2. Record a new crawl run
/// 3. Build the HTTP client
/// 4. Crawl the given URLs, or the configured seeds when none are given
/// 5. Close the run as completed or interrupted
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
/// * `urls` - Requested catalog pages
/// * `cancel` - Stops dispatching new work when triggered
pub async fn run_crawl(
    config: &Config,
    config_hash: &str,
    urls: Vec<String>,
    cancel: CancellationToken,
) -> Result<CrawlReport, CatalogError> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let store = Arc::new(Mutex::new(storage));
    let run_id = lock_store(&store)?.create_run(config_hash)?;
    tracing::info!("Starting crawl run {}", run_id);

    let fetcher = Arc::new(HttpFetcher::new(&config.user_agent)?);
    let settings = CrawlSettings::from_config(config)?;
    let orchestrator = Orchestrator::new(fetcher, Arc::clone(&store), settings);

    let seeds = if urls.is_empty() {
        config.site.seeds.clone()
    } else {
        urls
    };

    let report = orchestrator
        .run_with_cancel(&seeds, config.crawler.concurrency as usize, cancel)
        .await;

    let status = if report.was_interrupted() {
        RunStatus::Interrupted
    } else {
        RunStatus::Completed
    };
    lock_store(&store)?.finish_run(run_id, status)?;
    tracing::info!("Crawl run {} {}", run_id, status.to_db_string());

    Ok(report)
}
