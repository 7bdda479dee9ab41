//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the catalog site and run the
//! whole pipeline from fetch to stored record.

use crate::common::{
    mount_page, page_url, test_config, GACHIAKUTA_PAGE, GACHIAKUTA_PAGE_REVISED, GACHIAKUTA_PATH,
};
use manga_catalog::crawler::run_crawl;
use manga_catalog::storage::{open_storage, CatalogStore, RunStatus};
use manga_catalog::{CrawlState, PublicationStatus};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_full_crawl_stores_record() {
    let server = MockServer::start().await;
    mount_page(&server, GACHIAKUTA_PATH, GACHIAKUTA_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/mangas/missing.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");
    let config = test_config(&server.uri(), &db_path, 1, &[]);

    let page = page_url(&server, GACHIAKUTA_PATH);
    let missing = page_url(&server, "/mangas/missing.html");
    let report = run_crawl(
        &config,
        "test-hash",
        vec![
            page.clone(),
            missing.clone(),
            "https://example.com/mangas/gachiakuta.html".to_string(),
        ],
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.urls.len(), 3);
    let done = report.outcome_for(&page).unwrap();
    assert_eq!(done.outcome.state, CrawlState::Done);
    assert_eq!(done.outcome.attempts, 1);
    assert!(done.outcome.warnings.is_empty());

    let abandoned = report.outcome_for(&missing).unwrap();
    assert_eq!(abandoned.outcome.state, CrawlState::Abandoned);
    assert_eq!(abandoned.outcome.attempts, 3);

    assert_eq!(report.urls[2].outcome.state, CrawlState::Rejected);
    assert!(!report.all_succeeded());

    let storage = open_storage(&db_path).unwrap();
    let stored = storage.find_by_url(&page).unwrap().unwrap();
    let record = &stored.record;
    assert_eq!(record.title, "Gachiakuta");
    assert_eq!(record.original_title.as_deref(), Some("ガチアクタ"));
    assert_eq!(record.origin.as_deref(), Some("Japon - 2022"));
    assert_eq!(record.release_year.as_deref(), Some("2023"));
    assert_eq!(record.work_type.as_deref(), Some("Shônen"));
    assert_eq!(record.genres, vec!["Action", "Fantastique"]);
    assert_eq!(record.themes, vec!["Monde post-apocalyptique"]);
    assert_eq!(record.author.as_deref(), Some("URANA Kei"));
    assert_eq!(record.translator.as_deref(), Some("Sébastien Ludmann"));
    assert_eq!(record.publisher_original.as_deref(), Some("Kodansha"));
    assert_eq!(record.publisher_local.as_deref(), Some("Pika"));
    assert_eq!(record.volume_count_original.as_deref(), Some("12 (En cours)"));
    assert_eq!(record.volume_count_local.as_deref(), Some("9 (En cours)"));
    assert_eq!(record.price.as_deref(), Some("7.20 €"));
    assert_eq!(record.status, PublicationStatus::InProgress);

    let volumes = &record.volumes;
    let numbers: Vec<u32> = volumes.standard.iter().map(|v| v.number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(
        volumes.standard[0].image_url.as_deref(),
        Some(format!("{}/images/mangas/gachiakuta-1.jpg", server.uri()).as_str())
    );
    assert_eq!(volumes.special[0].label, "Tome 1 édition spéciale");
    let collector: Vec<&str> = volumes.collector.iter().map(|v| v.label.as_str()).collect();
    assert_eq!(collector, vec!["Volume collector 1", "Coffret 1"]);

    let run = storage.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_recrawl_replaces_every_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(GACHIAKUTA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(GACHIAKUTA_PAGE))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, GACHIAKUTA_PATH, GACHIAKUTA_PAGE_REVISED).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");
    let page = page_url(&server, GACHIAKUTA_PATH);
    let config = test_config(&server.uri(), &db_path, 1, &[page.clone()]);

    let first = run_crawl(&config, "h", vec![], CancellationToken::new())
        .await
        .unwrap();
    let second = run_crawl(&config, "h", vec![], CancellationToken::new())
        .await
        .unwrap();

    let first = first.urls[0].outcome.upsert.unwrap();
    let second = second.urls[0].outcome.upsert.unwrap();
    assert!(first.was_insert);
    assert!(!second.was_insert);
    assert_eq!(first.id, second.id);

    let storage = open_storage(&db_path).unwrap();
    assert_eq!(storage.count_total().unwrap(), 1);

    let stored = storage.find_by_id(first.id).unwrap().unwrap();
    let record = &stored.record;
    assert_eq!(record.title, "Gachiakuta (nouvelle édition)");
    assert_eq!(record.work_type.as_deref(), Some("Seinen"));
    assert_eq!(record.status, PublicationStatus::Completed);
    assert_eq!(record.original_title, None);
    assert!(record.genres.is_empty());
    assert_eq!(record.volumes.standard.len(), 1);
    assert_eq!(record.volumes.standard[0].number, 3);
    assert!(record.volumes.special.is_empty());
    assert!(record.volumes.collector.is_empty());
    assert!(stored.updated_at >= stored.created_at);
}

#[tokio::test]
async fn test_duplicate_requests_fetch_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(GACHIAKUTA_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(GACHIAKUTA_PAGE)
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");
    let config = test_config(&server.uri(), &db_path, 3, &[]);

    let page = page_url(&server, GACHIAKUTA_PATH);
    let report = run_crawl(
        &config,
        "h",
        vec![
            page.clone(),
            format!("{}#volumes", page),
            format!("{}?utm_source=newsletter", page),
        ],
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(report.all_succeeded());
    assert_eq!(report.urls.iter().filter(|r| r.shared).count(), 2);
    assert_eq!(report.inserted(), 1);
    assert!(report
        .urls
        .iter()
        .all(|r| r.canonical_url.as_deref() == Some(page.as_str())));
}

#[tokio::test]
async fn test_cancelled_crawl_marks_run_interrupted() {
    let server = MockServer::start().await;
    mount_page(&server, GACHIAKUTA_PATH, GACHIAKUTA_PAGE).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");
    let config = test_config(&server.uri(), &db_path, 1, &[]);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = run_crawl(
        &config,
        "h",
        vec![page_url(&server, GACHIAKUTA_PATH)],
        cancel,
    )
    .await
    .unwrap();

    assert_eq!(report.urls[0].outcome.state, CrawlState::Interrupted);

    let storage = open_storage(&db_path).unwrap();
    assert_eq!(storage.count_total().unwrap(), 0);
    assert_eq!(
        storage.latest_run().unwrap().unwrap().status,
        RunStatus::Interrupted
    );
}
