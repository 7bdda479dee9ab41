//! Single-flight registry of URLs within one run
//!
//! The first request for a canonical URL becomes its leader and processes
//! it. Concurrent requests wait for the leader's outcome; later requests
//! read the recorded outcome. The registry is the only state workers share.

use crate::crawler::report::UrlOutcome;
use crate::state::CrawlState;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

enum Entry {
    InFlight(watch::Receiver<Option<UrlOutcome>>),
    Completed(UrlOutcome),
}

/// What a worker should do with a URL it pulled from the queue
pub enum Claim {
    /// Process the URL, then hand the outcome to [`FlightRegistry::complete`]
    Leader(Leader),

    /// Another worker is processing the URL
    Waiter(watch::Receiver<Option<UrlOutcome>>),

    /// The URL was already processed in this run
    Completed(UrlOutcome),
}

/// Proof of leadership for one key
///
/// Dropping it without completing wakes waiters with a failure outcome.
pub struct Leader {
    key: String,
    sender: watch::Sender<Option<UrlOutcome>>,
}

#[derive(Default)]
pub struct FlightRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl FlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, key: &str) -> Claim {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(Entry::Completed(outcome)) => Claim::Completed(outcome.clone()),
            Some(Entry::InFlight(receiver)) => Claim::Waiter(receiver.clone()),
            None => {
                let (sender, receiver) = watch::channel(None);
                entries.insert(key.to_string(), Entry::InFlight(receiver));
                Claim::Leader(Leader {
                    key: key.to_string(),
                    sender,
                })
            }
        }
    }

    /// Records the leader's outcome and wakes every waiter
    pub fn complete(&self, leader: Leader, outcome: UrlOutcome) {
        self.lock()
            .insert(leader.key.clone(), Entry::Completed(outcome.clone()));
        // No receivers left is fine; the entry above serves later claims
        let _ = leader.sender.send(Some(outcome));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Waits for the leader of a key to publish its outcome
pub async fn wait_for_leader(mut receiver: watch::Receiver<Option<UrlOutcome>>) -> UrlOutcome {
    match receiver.wait_for(Option::is_some).await {
        Ok(published) => match &*published {
            Some(outcome) => outcome.clone(),
            None => leader_lost(),
        },
        Err(_) => leader_lost(),
    }
}

fn leader_lost() -> UrlOutcome {
    UrlOutcome::new(CrawlState::Abandoned, 0).with_error("worker processing this URL stopped")
}
