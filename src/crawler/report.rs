//! Per-run crawl results

use crate::extract::ExtractionWarning;
use crate::state::CrawlState;
use crate::storage::UpsertOutcome;
use serde::Serialize;
use std::time::Duration;

/// Final result of processing one canonical URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlOutcome {
    pub state: CrawlState,

    /// Number of fetch attempts started
    pub attempts: u32,

    /// Present when the record was persisted
    pub upsert: Option<UpsertOutcome>,

    /// Last error, for URLs that did not end in `Done`
    pub error: Option<String>,

    /// Warnings from the last extraction
    pub warnings: Vec<ExtractionWarning>,
}

impl UrlOutcome {
    pub fn new(state: CrawlState, attempts: u32) -> Self {
        Self {
            state,
            attempts,
            upsert: None,
            error: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Result for one requested URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlReport {
    /// The URL exactly as requested
    pub requested_url: String,

    /// Canonical form, absent for rejected URLs
    pub canonical_url: Option<String>,

    #[serde(flatten)]
    pub outcome: UrlOutcome,

    /// True if the outcome was observed from another request for the same
    /// canonical URL
    pub shared: bool,
}

/// Aggregate result of one orchestrator run, one entry per requested URL in
/// request order
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub urls: Vec<UrlReport>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CrawlReport {
    /// Finds the report of a URL by its requested or canonical form
    pub fn outcome_for(&self, url: &str) -> Option<&UrlReport> {
        self.urls
            .iter()
            .find(|report| report.requested_url == url)
            .or_else(|| {
                self.urls
                    .iter()
                    .find(|report| report.canonical_url.as_deref() == Some(url))
            })
    }

    pub fn count_in(&self, state: CrawlState) -> usize {
        self.urls
            .iter()
            .filter(|report| report.outcome.state == state)
            .count()
    }

    /// Number of requests whose record was newly inserted, counting each
    /// canonical URL once
    pub fn inserted(&self) -> usize {
        self.urls
            .iter()
            .filter(|report| !report.shared)
            .filter(|report| report.outcome.upsert.is_some_and(|u| u.was_insert))
            .count()
    }

    /// Number of requests whose record replaced a stored one, counting each
    /// canonical URL once
    pub fn updated(&self) -> usize {
        self.urls
            .iter()
            .filter(|report| !report.shared)
            .filter(|report| report.outcome.upsert.is_some_and(|u| !u.was_insert))
            .count()
    }

    /// Returns true if every requested URL ended in `Done`
    pub fn all_succeeded(&self) -> bool {
        self.urls
            .iter()
            .all(|report| report.outcome.state.is_success())
    }

    pub fn was_interrupted(&self) -> bool {
        self.count_in(CrawlState::Interrupted) > 0
    }
}
