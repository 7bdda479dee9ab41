//! Route handlers
//!
//! Every store call runs on the blocking pool; handlers never hold the store
//! lock across an await.

use crate::api::{ApiError, AppState};
use crate::output::{load_statistics, CatalogStatistics};
use crate::record::{PublicationStatus, StoredRecord};
use crate::storage::{
    lock_store, CatalogStore, ListQuery, Page, RecordUpdate, SqliteStorage, StorageResult,
    DEFAULT_PAGE_LIMIT,
};
use crate::url::{canonicalize_url, validate_catalog_url};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Largest page size a listing may request
pub const MAX_PAGE_LIMIT: u32 = 100;

async fn with_store<T, F>(state: &AppState, operation: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut SqliteStorage) -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(state.crawler.store());
    let result = tokio::task::spawn_blocking(move || {
        let mut guard = lock_store(&store)?;
        operation(&mut guard)
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(result?)
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::bad_request("Invalid record id").with_details(raw.to_string()))
}

fn invalid_json(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("Invalid JSON body").with_details(rejection.body_text())
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Query string of `GET /api/manga`
///
/// `genres` and `themes` are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    pub genres: Option<String>,
    pub themes: Option<String>,
    pub status: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    pub fn into_query(self) -> Result<ListQuery, ApiError> {
        let page = match non_blank(self.page) {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|page| *page >= 1)
                .ok_or_else(|| ApiError::bad_request("Invalid page").with_details(raw))?,
            None => 1,
        };

        let limit = match non_blank(self.limit) {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|limit| (1..=MAX_PAGE_LIMIT).contains(limit))
                .ok_or_else(|| {
                    ApiError::bad_request("Invalid limit")
                        .with_details(format!("{} (must be 1..={})", raw, MAX_PAGE_LIMIT))
                })?,
            None => DEFAULT_PAGE_LIMIT,
        };

        let status = match non_blank(self.status) {
            Some(raw) => Some(
                raw.parse::<PublicationStatus>()
                    .map_err(|e| ApiError::bad_request("Invalid status").with_details(e))?,
            ),
            None => None,
        };

        Ok(ListQuery {
            search: non_blank(self.search),
            work_type: non_blank(self.work_type),
            genres: split_list(self.genres),
            themes: split_list(self.themes),
            status,
            page,
            limit,
        })
    }
}

pub async fn list_records(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<StoredRecord>>, ApiError> {
    let Query(params) = params.map_err(|e| {
        ApiError::bad_request("Invalid query string").with_details(e.body_text())
    })?;
    let query = params.into_query()?;

    let page = with_store(&state, move |store| store.list(&query)).await?;
    Ok(Json(page))
}

pub async fn stats_overview(
    State(state): State<AppState>,
) -> Result<Json<CatalogStatistics>, ApiError> {
    let stats = with_store(&state, |store| load_statistics(&*store)).await?;
    Ok(Json(stats))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredRecord>, ApiError> {
    let id = parse_id(&id)?;
    with_store(&state, move |store| store.find_by_id(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Record not found"))
}

pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RecordUpdate>, JsonRejection>,
) -> Result<Json<StoredRecord>, ApiError> {
    let id = parse_id(&id)?;
    let Json(update) = payload.map_err(invalid_json)?;
    if update.is_empty() {
        return Err(ApiError::bad_request("No editable field provided"));
    }

    let stored = with_store(&state, move |store| store.update_by_id(id, &update)).await?;
    tracing::info!("Updated record {}", stored.id);
    Ok(Json(stored))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    if !with_store(&state, move |store| store.delete_by_id(id)).await? {
        return Err(ApiError::not_found("Record not found"));
    }

    tracing::info!("Deleted record {}", id);
    Ok(Json(json!({ "deleted": 1, "id": id })))
}

#[derive(Debug, Default, Deserialize)]
pub struct UrlParam {
    pub url: Option<String>,
}

/// `DELETE /api/manga/delete-by-url`, URL taken from the JSON body or the
/// query string
pub async fn delete_by_url(
    State(state): State<AppState>,
    query: Option<Query<UrlParam>>,
    body: Option<Json<UrlParam>>,
) -> Result<Json<Value>, ApiError> {
    let url = body
        .and_then(|Json(param)| non_blank(param.url))
        .or_else(|| query.and_then(|Query(param)| non_blank(param.url)))
        .ok_or_else(|| {
            ApiError::bad_request("URL is required")
                .with_details(r#"send {"url": "..."} as the body or ?url=... in the query"#)
        })?;

    // Stored keys are canonical; unparseable input is matched verbatim
    let key = canonicalize_url(&url)
        .map(|canonical| canonical.to_string())
        .unwrap_or_else(|_| url.clone());

    let deleted = with_store(&state, move |store| store.delete_by_url(&key)).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("No record with this URL"));
    }

    tracing::info!("Deleted {} record(s) for {}", deleted, url);
    Ok(Json(json!({ "deleted": deleted, "url": url })))
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: Option<String>,

    /// Re-scrape a URL that is already stored
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub record: StoredRecord,
    pub was_insert: bool,
    pub warnings: Vec<String>,
}

pub async fn scrape(
    State(state): State<AppState>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ScrapeResponse>), ApiError> {
    let Json(request) = payload.map_err(invalid_json)?;
    let url = non_blank(request.url).ok_or_else(|| ApiError::bad_request("URL is required"))?;

    let canonical = validate_catalog_url(&url, &state.crawler.settings().site)
        .map_err(|e| ApiError::bad_request("Not a catalog page URL").with_details(e.to_string()))?;

    // Held until the response is built; the stored check below happens under it
    let _slot = state.scrapes.try_begin(canonical.as_str()).ok_or_else(|| {
        ApiError::conflict("Scrape already in progress").with_details(canonical.to_string())
    })?;

    if !request.refresh {
        let key = canonical.to_string();
        if let Some(existing) = with_store(&state, move |store| store.find_by_url(&key)).await? {
            return Err(ApiError::conflict("Record already scraped")
                .with_details(format!("record {} (pass \"refresh\": true to re-scrape)", existing.id)));
        }
    }

    let report = state.crawler.run(&[url], 1).await;
    let entry = report
        .urls
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::internal("crawl produced no report"))?;

    let upsert = entry.outcome.upsert.ok_or_else(|| {
        ApiError::internal(
            entry
                .outcome
                .error
                .clone()
                .unwrap_or_else(|| format!("crawl ended in {}", entry.outcome.state)),
        )
    })?;

    let record = with_store(&state, move |store| store.find_by_id(upsert.id))
        .await?
        .ok_or_else(|| ApiError::internal(format!("record {} vanished after upsert", upsert.id)))?;

    let status = if upsert.was_insert {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(ScrapeResponse {
            record,
            was_insert: upsert.was_insert,
            warnings: entry.outcome.warnings.iter().map(ToString::to_string).collect(),
        }),
    ))
}
