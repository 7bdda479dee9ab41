//! Integration tests for the CRUD API
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; scrape
//! requests go to a wiremock catalog site.

use crate::common::{mount_page, page_url, GACHIAKUTA_PAGE, GACHIAKUTA_PATH};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use manga_catalog::api::{router, AppState};
use manga_catalog::config::{SiteConfig, UserAgentConfig};
use manga_catalog::crawler::{CrawlSettings, HttpFetcher, Orchestrator, RetryPolicy};
use manga_catalog::storage::SqliteStorage;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_app(server: &MockServer) -> Router {
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    let settings = CrawlSettings {
        fetch_timeout: Duration::from_secs(2),
        extraction_timeout: Duration::from_secs(2),
        retry: RetryPolicy {
            max_attempts: 2,
            base_backoff: Duration::from_millis(1),
        },
        site: SiteConfig {
            origin: server.uri(),
            catalog_path: "/mangas/".to_string(),
            seeds: vec![],
        },
        origin: Url::parse(&server.uri()).unwrap(),
    };

    let crawler = Orchestrator::new(
        Arc::new(HttpFetcher::new(&user_agent).unwrap()),
        Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap())),
        settings,
    );
    router(AppState::new(crawler))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}

#[tokio::test]
async fn test_healthz() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let (status, body) = send(&app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok\n".to_string()));
}

#[tokio::test]
async fn test_scrape_then_crud() {
    let server = MockServer::start().await;
    mount_page(&server, GACHIAKUTA_PATH, GACHIAKUTA_PAGE).await;
    let app = test_app(&server);
    let url = page_url(&server, GACHIAKUTA_PATH);

    // First scrape inserts
    let (status, body) = send(&app, "POST", "/api/manga/scrape", Some(json!({ "url": url }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["was_insert"], true);
    assert_eq!(body["record"]["title"], "Gachiakuta");
    assert_eq!(body["record"]["status"], "in_progress");
    let id = body["record"]["id"].as_i64().unwrap();

    // A stored URL conflicts unless refreshed
    let (status, body) = send(&app, "POST", "/api/manga/scrape", Some(json!({ "url": url }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Record already scraped");

    let (status, body) = send(
        &app,
        "POST",
        "/api/manga/scrape",
        Some(json!({ "url": url, "refresh": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["was_insert"], false);
    assert_eq!(body["record"]["id"], id);

    // Listing and filters
    let (status, body) = send(&app, "GET", "/api/manga?type=seinen&page=1&limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["limit"], 10);

    let (_, body) = send(&app, "GET", "/api/manga?search=urana&type=SH", None).await;
    assert_eq!(body["total"], 1);

    let (status, body) = send(&app, "GET", "/api/manga?genres=Drame,Action&status=in_progress", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["items"][0]["id"], id);

    // Fetch and update by id
    let (status, body) = send(&app, "GET", &format!("/api/manga/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["author"], "URANA Kei");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/manga/{}", id),
        Some(json!({ "price": "7.50 €", "translator": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], "7.50 €");
    assert!(body["translator"].is_null());
    assert_eq!(body["title"], "Gachiakuta");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/manga/{}", id),
        Some(json!({ "source_url": "https://elsewhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON body");

    // Aggregates
    let (status, body) = send(&app, "GET", "/api/manga/stats/overview", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["byType"][0]["type"], "Shônen");
    assert_eq!(body["byStatus"][0], json!({ "status": "in_progress", "count": 1 }));

    // Delete by URL, then the id is gone
    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/manga/delete-by-url?url={}", url),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);

    let (status, body) = send(&app, "GET", &format!("/api/manga/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Record not found");

    let (status, _) = send(&app, "DELETE", &format!("/api/manga/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_by_url_from_body() {
    let server = MockServer::start().await;
    mount_page(&server, GACHIAKUTA_PATH, GACHIAKUTA_PAGE).await;
    let app = test_app(&server);
    let url = page_url(&server, GACHIAKUTA_PATH);

    let (status, _) = send(&app, "POST", "/api/manga/scrape", Some(json!({ "url": url }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "DELETE", "/api/manga/delete-by-url", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL is required");

    let (status, body) = send(
        &app,
        "DELETE",
        "/api/manga/delete-by-url",
        Some(json!({ "url": format!("{}#top", url) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/manga/delete-by-url",
        Some(json!({ "url": url })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_requests_answer_json_errors() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let (status, body) = send(&app, "POST", "/api/manga/scrape", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL is required");

    let (status, body) = send(
        &app,
        "POST",
        "/api/manga/scrape",
        Some(json!({ "url": "https://example.com/animes/x.html" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Not a catalog page URL");
    assert!(body["details"].is_string());

    let (status, body) = send(&app, "GET", "/api/manga?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid page");

    let (status, body) = send(&app, "GET", "/api/manga/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid record id");

    let (status, body) = send(&app, "PUT", "/api/manga/1", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No editable field provided");

    let (status, body) = send(&app, "PUT", "/api/manga/1", Some(json!({ "price": "1 €" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Record not found");
}

#[tokio::test]
async fn test_failed_scrape_is_internal_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mangas/broken.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    let app = test_app(&server);

    let (status, body) = send(
        &app,
        "POST",
        "/api/manga/scrape",
        Some(json!({ "url": page_url(&server, "/mangas/broken.html") })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(body["details"].as_str().unwrap().contains("HTTP status 500"));

    let (_, body) = send(&app, "GET", "/api/manga", None).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn test_concurrent_scrapes_fetch_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(GACHIAKUTA_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(GACHIAKUTA_PAGE)
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(&server);
    let url = page_url(&server, GACHIAKUTA_PATH);

    let body = json!({ "url": url });
    let (first, second) = tokio::join!(
        send(&app, "POST", "/api/manga/scrape", Some(body.clone())),
        send(&app, "POST", "/api/manga/scrape", Some(body.clone())),
    );

    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);

    let conflict = if first.0 == StatusCode::CONFLICT { first.1 } else { second.1 };
    assert_eq!(conflict["error"], "Scrape already in progress");

    let (status, body) = send(&app, "POST", "/api/manga/scrape", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Record already scraped");
}
