//! Work queue and retry policy
//!
//! This module handles:
//! - The shared in-memory queue workers pull URLs from
//! - Stopping dispatch once cancellation is requested
//! - Exponential backoff between attempts of the same URL

use crate::config::CrawlerConfig;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A URL waiting for a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// Position of the request in the seed list
    pub index: usize,

    /// Canonical URL to crawl
    pub url: Url,
}

/// Shared FIFO queue of URLs to crawl
///
/// Once the cancellation token fires, [`Scheduler::next_url`] stops handing
/// out work; undispatched URLs stay queued for [`Scheduler::drain`].
pub struct Scheduler {
    queue: Mutex<VecDeque<QueuedUrl>>,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            cancel,
        }
    }

    pub fn push(&self, queued: QueuedUrl) {
        self.lock().push_back(queued);
    }

    /// Gets the next URL to process, or `None` when the queue is empty or
    /// the run was cancelled
    pub fn next_url(&self) -> Option<QueuedUrl> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.lock().pop_front()
    }

    /// Removes and returns every URL that was never dispatched
    pub fn drain(&self) -> Vec<QueuedUrl> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<QueuedUrl>> {
        // The queue holds no invariant a panicking holder could break
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// How many times a URL is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: config.retry_backoff(),
        }
    }

    /// Returns true if another attempt is allowed after `attempts` failures
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Delay before the attempt following attempt number `attempt`
    ///
    /// `base * 2^(attempt - 1)`, saturating.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_backoff
            .checked_mul(1u32 << exponent)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}
