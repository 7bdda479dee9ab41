//! Scrape requests currently being served, keyed by canonical URL

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct InFlightScrapes {
    urls: Arc<Mutex<HashSet<String>>>,
}

impl InFlightScrapes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `url`, or returns `None` while another request holds it
    ///
    /// The reservation lasts until the returned slot is dropped.
    pub fn try_begin(&self, url: &str) -> Option<ScrapeSlot> {
        if !self.lock().insert(url.to_string()) {
            return None;
        }
        Some(ScrapeSlot {
            urls: Arc::clone(&self.urls),
            url: url.to_string(),
        })
    }

    pub fn is_in_flight(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct ScrapeSlot {
    urls: Arc<Mutex<HashSet<String>>>,
    url: String,
}

impl Drop for ScrapeSlot {
    fn drop(&mut self) {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.url);
    }
}
