//! Crawl state definitions for tracking one URL through the pipeline
//!
//! `Queued -> Fetching -> Extracting -> Persisting -> Done` on success, with
//! `Failed` looping back to `Queued` while retry budget remains.

use serde::Serialize;
use std::fmt;

/// Represents the current state of a URL within one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    // ===== Active States =====
    /// Waiting for a worker (initially or before a retry)
    Queued,

    /// Page is currently being fetched
    Fetching,

    /// Fetched document is being parsed, extracted and normalized
    Extracting,

    /// Canonical record is being upserted
    Persisting,

    /// The last attempt failed; a retry may follow
    Failed,

    // ===== Terminal States =====
    /// Record was persisted
    Done,

    /// Retry budget exhausted, or a non-retryable error occurred
    Abandoned,

    /// URL was not accepted as a catalog page and never fetched
    Rejected,

    /// Processing stopped by cancellation before the pipeline finished
    Interrupted,
}

impl CrawlState {
    /// Returns true if this is a terminal state (no further processing)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done | Self::Abandoned | Self::Rejected | Self::Interrupted
        )
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if moving from `self` to `next` follows the pipeline
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        use CrawlState::*;

        match (self, next) {
            (Queued, Fetching) | (Queued, Rejected) | (Queued, Interrupted) => true,
            (Fetching, Extracting) | (Fetching, Failed) => true,
            (Extracting, Persisting) | (Extracting, Failed) => true,
            (Persisting, Done) | (Persisting, Failed) | (Persisting, Abandoned) => true,
            (Failed, Queued) | (Failed, Abandoned) | (Failed, Interrupted) => true,
            (Fetching, Interrupted) | (Extracting, Interrupted) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Persisting => "persisting",
            Self::Failed => "failed",
            Self::Done => "done",
            Self::Abandoned => "abandoned",
            Self::Rejected => "rejected",
            Self::Interrupted => "interrupted",
        }
    }

    /// Returns all possible crawl states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Fetching,
            Self::Extracting,
            Self::Persisting,
            Self::Failed,
            Self::Done,
            Self::Abandoned,
            Self::Rejected,
            Self::Interrupted,
        ]
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
