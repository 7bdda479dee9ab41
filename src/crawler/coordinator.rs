//! Crawl orchestration
//!
//! This module drives a set of requested URLs through the pipeline:
//! - Validating and canonicalizing every request
//! - Dispatching canonical URLs to a fixed pool of workers
//! - Fetching, extracting and persisting each URL under its own timeouts
//! - Retrying transient failures with exponential backoff
//! - Collapsing concurrent requests for the same canonical URL into one
//!   unit of work

use crate::config::{Config, SiteConfig};
use crate::crawler::fetcher::{FetchError, PageFetcher};
use crate::crawler::parser::parse_page;
use crate::crawler::registry::{wait_for_leader, Claim, FlightRegistry};
use crate::crawler::report::{CrawlReport, UrlOutcome, UrlReport};
use crate::crawler::scheduler::{QueuedUrl, RetryPolicy, Scheduler};
use crate::crawler::CrawlError;
use crate::extract::ExtractionWarning;
use crate::state::CrawlState;
use crate::storage::{lock_store, CatalogStore, UpsertOutcome};
use crate::url::validate_catalog_url;
use crate::UrlError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

/// Timeouts, retry budget and target site of a crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub fetch_timeout: Duration,
    pub extraction_timeout: Duration,
    pub retry: RetryPolicy,
    pub site: SiteConfig,

    /// Parsed site origin image paths are resolved against
    pub origin: Url,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Result<Self, UrlError> {
        Ok(Self {
            fetch_timeout: config.crawler.fetch_timeout(),
            extraction_timeout: config.crawler.extraction_timeout(),
            retry: RetryPolicy::from_config(&config.crawler),
            origin: config.site.origin_url()?,
            site: config.site.clone(),
        })
    }
}

/// Runs crawls against a page source and a shared store
///
/// Cloning is cheap; clones share the fetcher and the store.
pub struct Orchestrator<S> {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<Mutex<S>>,
    settings: Arc<CrawlSettings>,
}

impl<S> Clone for Orchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            store: Arc::clone(&self.store),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<S: CatalogStore + Send + 'static> Orchestrator<S> {
    pub fn new(fetcher: Arc<dyn PageFetcher>, store: Arc<Mutex<S>>, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            store,
            settings: Arc::new(settings),
        }
    }

    pub fn store(&self) -> &Arc<Mutex<S>> {
        &self.store
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Crawls `seeds` to completion with `concurrency` workers
    pub async fn run(&self, seeds: &[String], concurrency: usize) -> CrawlReport {
        self.run_with_cancel(seeds, concurrency, CancellationToken::new())
            .await
    }

    /// Crawls `seeds` until done or until `cancel` fires
    ///
    /// Returns one report per seed, in seed order. After cancellation no new
    /// fetch is started; URLs that were queued or between steps end in
    /// `Interrupted`.
    pub async fn run_with_cancel(
        &self,
        seeds: &[String],
        concurrency: usize,
        cancel: CancellationToken,
    ) -> CrawlReport {
        let started = Instant::now();
        let scheduler = Arc::new(Scheduler::new(cancel.clone()));
        let registry = Arc::new(FlightRegistry::new());
        let mut slots: Vec<Option<UrlReport>> = vec![None; seeds.len()];

        for (index, seed) in seeds.iter().enumerate() {
            match validate_catalog_url(seed, &self.settings.site) {
                Ok(url) => scheduler.push(QueuedUrl { index, url }),
                Err(e) => {
                    tracing::warn!("Rejecting {}: {}", seed, e);
                    slots[index] = Some(UrlReport {
                        requested_url: seed.clone(),
                        canonical_url: None,
                        outcome: UrlOutcome::new(CrawlState::Rejected, 0).with_error(e.to_string()),
                        shared: false,
                    });
                }
            }
        }

        let workers = concurrency.max(1).min(scheduler.len());
        tracing::info!(
            "Crawling {} URLs with {} workers",
            scheduler.len(),
            workers
        );

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let orchestrator = self.clone();
            let scheduler = Arc::clone(&scheduler);
            let registry = Arc::clone(&registry);
            let cancel = cancel.clone();

            pool.spawn(async move {
                let mut finished = Vec::new();
                while let Some(queued) = scheduler.next_url() {
                    let (outcome, shared) = orchestrator
                        .process_claimed(&queued.url, &registry, &cancel)
                        .await;
                    finished.push((queued, outcome, shared));
                }
                finished
            });
        }

        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(finished) => {
                    for (queued, outcome, shared) in finished {
                        slots[queued.index] = Some(UrlReport {
                            requested_url: seeds[queued.index].clone(),
                            canonical_url: Some(queued.url.to_string()),
                            outcome,
                            shared,
                        });
                    }
                }
                Err(e) => tracing::error!("Crawl worker failed: {}", e),
            }
        }

        for queued in scheduler.drain() {
            slots[queued.index] = Some(UrlReport {
                requested_url: seeds[queued.index].clone(),
                canonical_url: Some(queued.url.to_string()),
                outcome: UrlOutcome::new(CrawlState::Interrupted, 0)
                    .with_error("cancelled before dispatch"),
                shared: false,
            });
        }

        let urls = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| UrlReport {
                    requested_url: seeds[index].clone(),
                    canonical_url: None,
                    outcome: UrlOutcome::new(CrawlState::Abandoned, 0)
                        .with_error("worker task failed"),
                    shared: false,
                })
            })
            .collect();

        let report = CrawlReport {
            urls,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            "Crawl finished in {:.2}s: {} done, {} abandoned, {} rejected, {} interrupted",
            report.elapsed.as_secs_f64(),
            report.count_in(CrawlState::Done),
            report.count_in(CrawlState::Abandoned),
            report.count_in(CrawlState::Rejected),
            report.count_in(CrawlState::Interrupted)
        );
        report
    }

    /// Processes a URL unless another request for it is already handled
    ///
    /// Returns the outcome and whether it was observed from another request.
    async fn process_claimed(
        &self,
        url: &Url,
        registry: &FlightRegistry,
        cancel: &CancellationToken,
    ) -> (UrlOutcome, bool) {
        match registry.claim(url.as_str()) {
            Claim::Leader(leader) => {
                let outcome = self.process_url(url, cancel).await;
                registry.complete(leader, outcome.clone());
                (outcome, false)
            }
            Claim::Waiter(receiver) => {
                tracing::debug!("{} is already in flight, waiting for its outcome", url);
                (wait_for_leader(receiver).await, true)
            }
            Claim::Completed(outcome) => (outcome, true),
        }
    }

    /// Drives one canonical URL through its attempts to a terminal state
    async fn process_url(&self, url: &Url, cancel: &CancellationToken) -> UrlOutcome {
        let mut state = CrawlState::Queued;
        let mut attempts = 0;
        let mut warnings = Vec::new();

        loop {
            if cancel.is_cancelled() {
                advance(url, &mut state, CrawlState::Interrupted);
                return finish(state, attempts, warnings, Some("cancelled".to_string()));
            }

            attempts += 1;
            let span = tracing::info_span!("crawl_url", url = %url, attempt = attempts);
            let result = self
                .attempt(url, &mut state, &mut warnings, cancel)
                .instrument(span)
                .await;

            let error = match result {
                Ok(upsert) => {
                    advance(url, &mut state, CrawlState::Done);
                    tracing::info!(
                        "Stored {} as record {} ({})",
                        url,
                        upsert.id,
                        if upsert.was_insert { "new" } else { "updated" }
                    );
                    let mut outcome = finish(state, attempts, warnings, None);
                    outcome.upsert = Some(upsert);
                    return outcome;
                }
                Err(CrawlError::Interrupted) => {
                    advance(url, &mut state, CrawlState::Interrupted);
                    return finish(state, attempts, warnings, Some("cancelled".to_string()));
                }
                Err(e) => e,
            };

            if matches!(error, CrawlError::ConstraintViolation(_)) {
                advance(url, &mut state, CrawlState::Abandoned);
                tracing::warn!("Abandoning {}: {}", url, error);
                return finish(state, attempts, warnings, Some(error.to_string()));
            }

            advance(url, &mut state, CrawlState::Failed);
            if !error.is_transient() || !self.settings.retry.allows_retry(attempts) {
                advance(url, &mut state, CrawlState::Abandoned);
                tracing::warn!(
                    "Abandoning {} after {} attempts: {}",
                    url,
                    attempts,
                    error
                );
                return finish(state, attempts, warnings, Some(error.to_string()));
            }

            let delay = self.settings.retry.backoff_for(attempts);
            tracing::info!(
                "Attempt {} for {} failed ({}), retrying in {:?}",
                attempts,
                url,
                error,
                delay
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => advance(url, &mut state, CrawlState::Queued),
                _ = cancel.cancelled() => {
                    advance(url, &mut state, CrawlState::Interrupted);
                    return finish(state, attempts, warnings, Some(error.to_string()));
                }
            }
        }
    }

    /// One fetch, extract and persist pass
    async fn attempt(
        &self,
        url: &Url,
        state: &mut CrawlState,
        warnings: &mut Vec<ExtractionWarning>,
        cancel: &CancellationToken,
    ) -> Result<UpsertOutcome, CrawlError> {
        advance(url, state, CrawlState::Fetching);
        let fetch_timeout = self.settings.fetch_timeout;
        let fetch = self.fetcher.fetch(url, fetch_timeout);
        let html = match tokio::time::timeout(fetch_timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => return Err(FetchError::Timeout.into()),
        };

        if cancel.is_cancelled() {
            return Err(CrawlError::Interrupted);
        }

        advance(url, state, CrawlState::Extracting);
        let origin = self.settings.origin.clone();
        let source_url = url.to_string();
        // A timed-out extraction keeps running on the blocking pool; its result is dropped
        let extraction = tokio::task::spawn_blocking(move || parse_page(&html, &origin, &source_url));
        let parsed = match tokio::time::timeout(self.settings.extraction_timeout, extraction).await {
            Ok(Ok(parsed)) => parsed,
            Ok(Err(e)) => return Err(CrawlError::ExtractionPanicked(e.to_string())),
            Err(_) => {
                return Err(CrawlError::ExtractionTimeout(
                    self.settings.extraction_timeout,
                ))
            }
        };
        *warnings = parsed.warnings;

        if cancel.is_cancelled() {
            return Err(CrawlError::Interrupted);
        }

        advance(url, state, CrawlState::Persisting);
        let store = Arc::clone(&self.store);
        let record = parsed.record;
        let upsert = tokio::task::spawn_blocking(move || {
            let mut guard = lock_store(&store)?;
            guard.upsert(&record)
        })
        .await
        .map_err(|e| CrawlError::StoreUnavailable(e.to_string()))??;

        Ok(upsert)
    }
}

fn advance(url: &Url, state: &mut CrawlState, next: CrawlState) {
    if !state.can_transition_to(next) {
        tracing::warn!("Unexpected transition for {}: {} -> {}", url, state, next);
    }
    tracing::trace!("{}: {} -> {}", url, state, next);
    *state = next;
}

fn finish(
    state: CrawlState,
    attempts: u32,
    warnings: Vec<ExtractionWarning>,
    error: Option<String>,
) -> UrlOutcome {
    UrlOutcome {
        state,
        attempts,
        upsert: None,
        error,
        warnings,
    }
}
