use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Default site origin used when resolving relative image paths
pub const DEFAULT_SITE_ORIGIN: &str = "https://www.nautiljon.com";

/// Main configuration structure for manga-catalog
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub site: SiteConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of workers processing URLs concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Attempts per URL before it is abandoned
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wall-clock limit for one fetch attempt (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Wall-clock limit for parsing and extracting one page (milliseconds)
    #[serde(
        rename = "extraction-timeout-ms",
        default = "default_extraction_timeout_ms"
    )]
    pub extraction_timeout_ms: u64,

    /// Base delay before a retry, doubled on every further attempt (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            extraction_timeout_ms: default_extraction_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_concurrency() -> u32 {
    1
}

fn default_max_attempts() -> u32 {
    3
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_extraction_timeout_ms() -> u64 {
    60_000
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// The single site this crawler targets
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host that catalog pages and images live under
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path fragment every catalog detail page contains
    #[serde(rename = "catalog-path", default = "default_catalog_path")]
    pub catalog_path: String,

    /// Detail pages crawled by `crawl` when no URLs are given
    #[serde(default)]
    pub seeds: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            catalog_path: default_catalog_path(),
            seeds: Vec::new(),
        }
    }
}

impl SiteConfig {
    /// The origin as a parsed URL, used to resolve image paths
    pub fn origin_url(&self) -> Result<url::Url, crate::UrlError> {
        url::Url::parse(&self.origin).map_err(|e| crate::UrlError::Parse(e.to_string()))
    }
}

fn default_origin() -> String {
    DEFAULT_SITE_ORIGIN.to_string()
}

fn default_catalog_path() -> String {
    "/mangas/".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the API listens on
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

/// Verbosity of the crate's own log output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Raises the level by `steps` (e.g. one per `-v` flag), saturating at trace
    pub fn raised(self, steps: u8) -> Self {
        let all = [
            Self::Error,
            Self::Warn,
            Self::Info,
            Self::Debug,
            Self::Trace,
        ];
        let index = all.iter().position(|l| *l == self).unwrap_or(2);
        all[(index + steps as usize).min(all.len() - 1)]
    }

    /// Filter directive restricting noisy dependencies to warnings
    pub fn filter_directive(self) -> String {
        match self {
            Self::Trace => "trace".to_string(),
            level => format!("manga_catalog={},warn", level),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        f.write_str(s)
    }
}
