//! Configuration module for manga-catalog
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use manga_catalog::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("catalog.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, LogLevel, LoggingConfig, OutputConfig, ServerConfig, SiteConfig,
    UserAgentConfig, DEFAULT_SITE_ORIGIN,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::MAX_CONCURRENCY;
