//! Integration tests for the fetch engine.
//!
//! These tests drive full plans against a mock search API and check what
//! lands on disk.

mod support;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use soch_download::storage::Stage;
use soch_download::{
    ClientConfig, FetchEngine, FetchError, PAGE_SIZE, PagePlan, Progress, SearchClient,
    StorageError,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use support::{
    API_PATH, PageResponder, endpoint, mount_pages, page_requests, start_mock_server_or_skip,
    start_record,
};

fn client_for(endpoint: String) -> SearchClient {
    SearchClient::new(ClientConfig::default().with_endpoint(endpoint))
        .expect("client should build")
}

fn plan_for(total_hits: u64) -> PagePlan {
    PagePlan::new("geoDataExists=j", total_hits, PAGE_SIZE).expect("non-empty plan")
}

#[tokio::test]
async fn test_fetch_writes_one_file_per_page() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_pages(&mock_server, PageResponder::new(1234, 3)).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let page_dir = temp_dir.path().join("raw_data");

    let engine = FetchEngine::new(client_for(endpoint(&mock_server)), 2).expect("engine");
    let progress = Arc::new(Progress::new());
    let plan = plan_for(1234);
    let report = engine
        .run(&plan, &page_dir, Arc::clone(&progress))
        .await
        .expect("fetch should run");

    assert!(report.is_complete(), "report: {report:?}");
    assert_eq!(report.completed(), 3);
    assert!(report.bytes() > 0);
    for offset in [0, 500, 1000] {
        let file = page_dir.join(format!("{offset}.xml"));
        let contents = std::fs::read_to_string(&file).expect("page file should exist");
        assert!(contents.contains("<totalHits>1234</totalHits>"));
        assert!(contents.contains(&format!("raa/item/{offset}\"")));
    }

    assert_eq!(progress.total(), 3);
    assert_eq!(progress.started(), 3);
    assert_eq!(progress.succeeded(), 3);
    assert_eq!(progress.finished(), 3);
    assert!(progress.is_done());
}

#[tokio::test]
async fn test_fetch_requests_each_offset_exactly_once() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_pages(&mock_server, PageResponder::new(2600, 1)).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let engine = FetchEngine::new(client_for(endpoint(&mock_server)), 4).expect("engine");
    engine
        .run(&plan_for(2600), temp_dir.path(), Arc::new(Progress::new()))
        .await
        .expect("fetch should run");

    let requests = page_requests(&mock_server).await;
    let offsets: Vec<u64> = requests.iter().filter_map(start_record).collect();
    let unique: HashSet<u64> = offsets.iter().copied().collect();
    assert_eq!(offsets.len(), 6);
    assert_eq!(unique, HashSet::from([0, 500, 1000, 1500, 2000, 2500]));
    assert!(requests.iter().all(|request| {
        request
            .url
            .query_pairs()
            .any(|(key, value)| key == "query" && value == "geoDataExists=j")
    }));
}

#[tokio::test]
async fn test_fetch_non_empty_directory_issues_no_requests() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_pages(&mock_server, PageResponder::new(10, 1)).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    std::fs::write(temp_dir.path().join("0.xml"), "old run").expect("seed file");

    let engine = FetchEngine::new(client_for(endpoint(&mock_server)), 2).expect("engine");
    let err = engine
        .run(&plan_for(10), temp_dir.path(), Arc::new(Progress::new()))
        .await
        .expect_err("non-empty dir should be refused");

    assert!(
        matches!(
            err,
            FetchError::Storage(StorageError::DirectoryNotEmpty {
                stage: Stage::Pages,
                ..
            })
        ),
        "unexpected error: {err:?}"
    );
    assert!(page_requests(&mock_server).await.is_empty());
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("0.xml")).expect("seed file"),
        "old run"
    );
}

#[tokio::test]
async fn test_fetch_hidden_files_do_not_block() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_pages(&mock_server, PageResponder::new(10, 1)).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    std::fs::write(temp_dir.path().join(".gitkeep"), "").expect("seed hidden file");

    let engine = FetchEngine::new(client_for(endpoint(&mock_server)), 2).expect("engine");
    let report = engine
        .run(&plan_for(10), temp_dir.path(), Arc::new(Progress::new()))
        .await
        .expect("hidden files should be ignored");

    assert!(report.is_complete());
    assert!(temp_dir.path().join("0.xml").exists());
}

#[tokio::test]
async fn test_fetch_failed_page_does_not_stop_siblings() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_pages(
        &mock_server,
        PageResponder::new(1500, 1).failing(&[500]),
    )
    .await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let engine = FetchEngine::new(client_for(endpoint(&mock_server)), 3).expect("engine");
    let progress = Arc::new(Progress::new());
    let report = engine
        .run(&plan_for(1500), temp_dir.path(), Arc::clone(&progress))
        .await
        .expect("fetch should run");

    assert!(!report.is_complete());
    assert_eq!(report.completed(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures()[0].start_offset, 500);
    assert!(report.failures()[0].reason.contains("500"));
    assert_eq!(report.missing(), &[500]);

    assert!(temp_dir.path().join("0.xml").exists());
    assert!(!temp_dir.path().join("500.xml").exists());
    assert!(temp_dir.path().join("1000.xml").exists());

    assert_eq!(progress.succeeded(), 2);
    assert_eq!(progress.failed(), 1);
    assert!(progress.is_done());
}

#[tokio::test]
async fn test_fetch_respects_concurrency_limit() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let delay = Duration::from_millis(150);
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("hitsPerPage", "500"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(support::search_response(2000, &[]))
                .set_delay(delay),
        )
        .mount(&mock_server)
        .await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let engine = FetchEngine::new(client_for(endpoint(&mock_server)), 1).expect("engine");
    let started = Instant::now();
    let report = engine
        .run(&plan_for(2000), temp_dir.path(), Arc::new(Progress::new()))
        .await
        .expect("fetch should run");

    // One worker means the four delayed responses are served back to back
    assert!(report.is_complete());
    assert!(started.elapsed() >= delay * 4);
}
