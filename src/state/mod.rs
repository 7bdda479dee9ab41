//! State module for tracking crawl progress
//!
//! `CrawlState` tracks one URL through fetch, extraction and persistence,
//! including the retry loop and terminal outcomes.

mod crawl_state;

pub use crawl_state::CrawlState;
