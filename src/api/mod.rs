//! CRUD API over the catalog
//!
//! Thin `axum` layer mapping HTTP to store and orchestrator calls. Routes:
//!
//! - `GET    /api/manga` - filtered, paginated listing
//! - `GET    /api/manga/stats/overview` - counts by type and status
//! - `DELETE /api/manga/delete-by-url` - delete by source URL
//! - `POST   /api/manga/scrape` - crawl one URL and return the stored record
//! - `GET|PUT|DELETE /api/manga/:id`
//! - `GET    /healthz`

mod error;
mod handlers;
mod inflight;

pub use error::ApiError;
pub use inflight::{InFlightScrapes, ScrapeSlot};
pub use handlers::{ListParams, ScrapeRequest, ScrapeResponse, MAX_PAGE_LIMIT};

use crate::config::Config;
use crate::crawler::{CrawlSettings, HttpFetcher, Orchestrator};
use crate::storage::{open_storage, SqliteStorage};
use crate::CatalogError;
use axum::routing::{delete, get, post};
use axum::Router;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    crawler: Orchestrator<SqliteStorage>,
    scrapes: InFlightScrapes,
}

impl AppState {
    pub fn new(crawler: Orchestrator<SqliteStorage>) -> Self {
        Self {
            crawler,
            scrapes: InFlightScrapes::new(),
        }
    }
}

/// Builds the application router
pub fn router(state: AppState) -> Router {
    let manga = Router::new()
        .route("/", get(handlers::list_records))
        .route("/stats/overview", get(handlers::stats_overview))
        .route("/delete-by-url", delete(handlers::delete_by_url))
        .route("/scrape", post(handlers::scrape))
        .route(
            "/:id",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        );

    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .nest("/api/manga", manga)
        .with_state(state)
}

/// Serves the API on the configured address until `shutdown` fires
pub async fn serve(config: &Config, shutdown: CancellationToken) -> Result<(), CatalogError> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let fetcher = Arc::new(HttpFetcher::new(&config.user_agent)?);
    let crawler = Orchestrator::new(
        fetcher,
        Arc::new(Mutex::new(storage)),
        CrawlSettings::from_config(config)?,
    );

    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str()).await?;
    tracing::info!("API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(AppState::new(crawler)))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("API stopped");
    Ok(())
}
