//! manga-catalog main entry point
//!
//! This is the command-line interface for the manga-catalog scraper.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use manga_catalog::config::{load_config_with_hash, Config, LogLevel, MAX_CONCURRENCY};
use manga_catalog::crawler::run_crawl;
use manga_catalog::output::{load_statistics, print_statistics, render_crawl_report, render_record_page};
use manga_catalog::storage::{open_storage, CatalogStore, ListQuery, SqliteStorage};
use manga_catalog::url::{canonicalize_url, validate_catalog_url};
use manga_catalog::PublicationStatus;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// manga-catalog: a catalog scraper for Nautiljon manga pages
///
/// Crawls manga detail pages, extracts a structured record from each and
/// keeps them in a SQLite catalog that can be queried from the command line
/// or served over HTTP.
#[derive(Parser, Debug)]
#[command(name = "manga-catalog")]
#[command(version)]
#[command(about = "A catalog scraper for Nautiljon manga pages", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, value_name = "CONFIG", default_value = "manga-catalog.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be done without doing it
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the given catalog pages, or the configured seeds
    Crawl {
        /// Catalog page URLs
        urls: Vec<String>,

        /// Number of concurrent workers (overrides the config)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_CONCURRENCY)))]
        concurrency: Option<u32>,
    },

    /// Serve the CRUD API
    Serve {
        /// Socket address to listen on (overrides the config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// List stored records
    List {
        /// Substring of the title, original title or author
        #[arg(long)]
        search: Option<String>,

        /// Substring of the work type
        #[arg(long = "type")]
        work_type: Option<String>,

        /// Genre to match; repeat for any-of
        #[arg(long = "genre")]
        genres: Vec<String>,

        /// Theme to match; repeat for any-of
        #[arg(long = "theme")]
        themes: Vec<String>,

        /// in_progress, completed or unknown
        #[arg(long)]
        status: Option<PublicationStatus>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Print one record as JSON
    Show { id: i64 },

    /// Show catalog statistics
    Stats,

    /// Delete a record by id or by source URL
    Delete {
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        id: Option<i64>,

        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    setup_logging(config.logging.level, cli.verbose, cli.quiet);
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli.command);
        return Ok(ExitCode::SUCCESS);
    }

    match cli.command {
        Command::Crawl { urls, concurrency } => {
            if let Some(concurrency) = concurrency {
                config.crawler.concurrency = concurrency;
            }
            handle_crawl(&config, &config_hash, urls).await
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            handle_serve(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::List {
            search,
            work_type,
            genres,
            themes,
            status,
            page,
            limit,
        } => {
            let query = ListQuery {
                search,
                work_type,
                genres,
                themes,
                status,
                page: page.max(1),
                limit: limit.max(1),
            };
            let storage = open_store(&config)?;
            print!("{}", render_record_page(&storage.list(&query)?));
            Ok(ExitCode::SUCCESS)
        }
        Command::Show { id } => {
            let storage = open_store(&config)?;
            match storage.find_by_id(id)? {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                    Ok(ExitCode::SUCCESS)
                }
                None => bail!("No record with id {}", id),
            }
        }
        Command::Stats => {
            let storage = open_store(&config)?;
            println!("Database: {}\n", config.output.database_path);
            print_statistics(&load_statistics(&storage)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Delete { id, url } => {
            let mut storage = open_store(&config)?;
            let deleted = match (id, url) {
                (Some(id), _) => u64::from(storage.delete_by_id(id)?),
                (None, Some(url)) => {
                    let key = canonicalize_url(&url)
                        .map(|canonical| canonical.to_string())
                        .unwrap_or(url);
                    storage.delete_by_url(&key)?
                }
                (None, None) => bail!("Either --id or --url is required"),
            };

            if deleted == 0 {
                bail!("No matching record");
            }
            println!("Deleted {} record(s)", deleted);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Sets up the logging/tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise the configured level, raised by `-v`
/// or lowered to errors by `--quiet`.
fn setup_logging(level: LogLevel, verbose: u8, quiet: bool) {
    let directive = if quiet {
        "error".to_string()
    } else {
        level.raised(verbose).filter_directive()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_store(config: &Config) -> Result<SqliteStorage> {
    open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))
}

/// Cancels the returned token on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight steps");
            trigger.cancel();
        }
    });
    cancel
}

/// Handles --dry-run: the configuration is already valid once loaded
fn handle_dry_run(config: &Config, command: &Command) {
    println!("=== manga-catalog Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Max attempts: {}", config.crawler.max_attempts);
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout_ms);
    println!("  Extraction timeout: {}ms", config.crawler.extraction_timeout_ms);
    println!("  Retry backoff: {}ms", config.crawler.retry_backoff_ms);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSite:");
    println!("  Origin: {}", config.site.origin);
    println!("  Catalog path: {}", config.site.catalog_path);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  API bind: {}", config.server.bind);

    println!("\n✓ Configuration is valid");

    if let Command::Crawl { urls, .. } = command {
        let requested = if urls.is_empty() {
            &config.site.seeds
        } else {
            urls
        };

        println!("\nWould crawl {} URLs:", requested.len());
        for url in requested {
            match validate_catalog_url(url, &config.site) {
                Ok(canonical) => println!("  * {}", canonical),
                Err(e) => println!("  x {} ({})", url, e),
            }
        }
    }
}

/// Handles the crawl command
async fn handle_crawl(config: &Config, config_hash: &str, urls: Vec<String>) -> Result<ExitCode> {
    let requested = if urls.is_empty() {
        config.site.seeds.len()
    } else {
        urls.len()
    };
    if requested == 0 {
        bail!("Nothing to crawl: pass URLs or configure [site] seeds");
    }
    tracing::info!(
        "Crawling {} URLs with concurrency {}",
        requested,
        config.crawler.concurrency
    );

    let report = run_crawl(config, config_hash, urls, cancel_on_ctrl_c())
        .await
        .context("Crawl failed")?;
    print!("{}", render_crawl_report(&report));

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Handles the serve command
async fn handle_serve(config: &Config) -> Result<()> {
    manga_catalog::api::serve(config, cancel_on_ctrl_c())
        .await
        .context("API server failed")
}
