//! Integration tests for the page fetcher and full scrape pipeline
//!
//! These tests run against a local mock server and verify:
//! - Browser headers and cache busting on every request
//! - Retries with User-Agent rotation
//! - Challenge-page and content-type detection
//! - Error classification once attempts are exhausted

use std::sync::Arc;

use garden_stock::models::FetcherConfig;
use garden_stock::services::PageFetcher;
use garden_stock::utils::log::{NullSink, PipelineEvent, RecordingSink};
use garden_stock::{Config, FetchError, StockItem, StockScraper};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STOCK_PATH: &str = "/grow-a-garden/stock";

const STOCK_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Grow a Garden Stock</title></head><body>
<div class="grid grid-cols-1 md:grid-cols-3 gap-6">
  <div>
    <h2>GEAR STOCK</h2>
    <ul class="space-y-2">
      <li><span>Trowel <span class="text-gray-400">x3</span></span></li>
      <li><span>Watering Can <span class="text-gray-400">x1</span></span></li>
    </ul>
  </div>
  <div>
    <h2>EGG STOCK</h2>
    <ul class="space-y-2">
      <li><span>Common Egg <span class="text-gray-400">x1</span></span></li>
    </ul>
  </div>
  <div>
    <h2>SEEDS STOCK</h2>
    <ul class="space-y-2">
      <li><span>Carrot <span class="text-gray-400">x12</span></span></li>
    </ul>
  </div>
</div>
</body></html>"#;

const CHALLENGE_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Just a moment...</title></head>
<body><div id="challenge-platform">Checking your browser before accessing the site.</div></body></html>"#;

/// Helper function to build fetcher settings without delays
fn create_test_config(server: &MockServer, user_agents: &[&str]) -> FetcherConfig {
    FetcherConfig {
        url: format!("{}{}", server.uri(), STOCK_PATH),
        user_agents: user_agents.iter().map(|ua| ua.to_string()).collect(),
        timeout_secs: 5,
        retry_delay_ms: 0,
        pre_request_delay_ms: 0,
        ..FetcherConfig::default()
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_fetch_sends_browser_headers_and_cache_buster() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STOCK_PATH))
        .respond_with(html(STOCK_PAGE).insert_header("date", "Sun, 01 Jun 2025 12:58:30 GMT"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(
        create_test_config(&server, &["TestBrowser/1.0"]),
        Arc::new(NullSink),
    )
    .unwrap();
    let page = fetcher.fetch_page().await.unwrap();

    assert_eq!(page.status, 200);
    assert!(page.html.contains("GEAR STOCK"));
    assert_eq!(
        page.server_time.map(|t| t.to_rfc3339()),
        Some("2025-06-01T12:58:30+00:00".to_string())
    );

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    assert_eq!(
        request.headers.get("user-agent").unwrap(),
        "TestBrowser/1.0"
    );
    assert!(request.headers.get("accept-language").is_some());
    assert_eq!(request.headers.get("cache-control").unwrap(), "no-cache");
    assert!(request.url.query_pairs().any(|(key, _)| key == "t"));
}

#[tokio::test]
async fn test_fetch_retries_with_next_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STOCK_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(STOCK_PATH))
        .respond_with(html(STOCK_PAGE))
        .mount(&server)
        .await;

    let sink = RecordingSink::new();
    let fetcher = PageFetcher::new(
        create_test_config(&server, &["AgentOne/1.0", "AgentTwo/1.0"]),
        sink.clone(),
    )
    .unwrap();

    assert!(fetcher.fetch_page().await.is_ok());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_ne!(
        requests[0].headers.get("user-agent"),
        requests[1].headers.get("user-agent")
    );
    assert_eq!(
        sink.count(|e| matches!(e, PipelineEvent::AttemptFailed { attempt: 1, .. })),
        1
    );
}

#[tokio::test]
async fn test_challenge_page_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STOCK_PATH))
        .respond_with(html(CHALLENGE_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let sink = RecordingSink::new();
    let fetcher =
        PageFetcher::new(create_test_config(&server, &["TestBrowser/1.0"]), sink.clone()).unwrap();

    let err = fetcher.fetch_page().await.unwrap_err();
    assert!(matches!(err, FetchError::Blocked(_)));
    assert_eq!(
        sink.count(|e| matches!(e, PipelineEvent::ChallengeDetected { .. })),
        1
    );
}

#[tokio::test]
async fn test_challenge_page_retried_without_fail_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STOCK_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_raw(CHALLENGE_PAGE, "text/html"))
        .expect(3)
        .mount(&server)
        .await;

    let config = FetcherConfig {
        fail_fast_on_challenge: false,
        ..create_test_config(&server, &["TestBrowser/1.0"])
    };
    let fetcher = PageFetcher::new(config, Arc::new(NullSink)).unwrap();

    let err = fetcher.fetch_page().await.unwrap_err();
    assert!(matches!(err, FetchError::Blocked(_)));
    assert!(err.detail().contains("after 3 attempt(s)"));
}

#[tokio::test]
async fn test_non_html_content_type_is_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STOCK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"stock":[]}"#, "application/json"))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(
        create_test_config(&server, &["TestBrowser/1.0"]),
        Arc::new(NullSink),
    )
    .unwrap();

    let err = fetcher.fetch_page().await.unwrap_err();
    assert!(matches!(err, FetchError::Blocked(_)));
    assert!(err.detail().contains("application/json"));
}

#[tokio::test]
async fn test_exhausted_attempts_are_network_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STOCK_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(
        create_test_config(&server, &["TestBrowser/1.0"]),
        Arc::new(NullSink),
    )
    .unwrap();

    let err = fetcher.fetch_page().await.unwrap_err();
    assert!(matches!(err, FetchError::Network(_)));
    assert!(err.detail().contains("HTTP status 500 after 3 attempt(s)"));
    assert_eq!(err.kind(), "network_error");
}

#[tokio::test]
async fn test_scraper_end_to_end_uses_server_clock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STOCK_PATH))
        .respond_with(html(STOCK_PAGE).insert_header("date", "Sun, 01 Jun 2025 12:58:30 GMT"))
        .mount(&server)
        .await;

    let config = Config {
        fetcher: create_test_config(&server, &["TestBrowser/1.0"]),
        ..Config::default()
    };
    let scraper = StockScraper::new(&config, Arc::new(NullSink)).unwrap();
    let snapshot = scraper.fetch_stock_snapshot().await.unwrap();

    assert_eq!(
        snapshot.gear_stock.items,
        vec![StockItem::new("Trowel", 3), StockItem::new("Watering Can", 1)]
    );
    assert_eq!(snapshot.egg_stock.items, vec![StockItem::new("Common Egg", 1)]);
    assert_eq!(snapshot.seeds_stock.items, vec![StockItem::new("Carrot", 12)]);
    assert_eq!(snapshot.gear_stock.updates_in, "01m 30s");
    assert_eq!(snapshot.egg_stock.updates_in, "01m 30s");
}
