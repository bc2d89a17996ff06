//! Integration tests for the crawl client
//!
//! These tests use wiremock to stand in for the scraping service and run
//! the full submit/poll cycle over real HTTP.

use ember_poll::config::Config;
use ember_poll::service::PollOutcome;
use ember_poll::{
    BatchRunner, CrawlClient, CrawlError, CrawlRequest, FirecrawlService, ScrapeService,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server, with delays
/// short enough to keep the tests fast
fn create_test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.service.endpoint = format!("{}/v1/crawl", server.uri());
    config.service.api_key = Some("fc-test".to_string());
    config.polling.interval_ms = 10;
    config.retry.transient_delay_ms = 10;
    config.retry.rate_limit_delay_ms = 20;
    config
}

fn accepted(server: &MockServer, id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "id": id,
        "url": format!("{}/v1/crawl/{}", server.uri(), id),
    }))
}

fn status(status: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": status }))
}

fn completed(html: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "completed",
        "data": [{ "html": html, "metadata": { "statusCode": 200 } }],
    }))
}

async fn mount_completed_job(server: &MockServer, id: &str, scraping_polls: u64, html: &str) {
    let poll_path = format!("/v1/crawl/{}", id);

    if scraping_polls > 0 {
        Mock::given(method("GET"))
            .and(path(poll_path.as_str()))
            .respond_with(status("scraping"))
            .up_to_n_times(scraping_polls)
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path(poll_path.as_str()))
        .respond_with(completed(html))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_cycle() {
    let mock_server = MockServer::start().await;

    // The submission carries the bearer credential and the default options
    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .and(header("authorization", "Bearer fc-test"))
        .and(body_json(json!({
            "url": "https://www.who.int/data/covid",
            "scrapeOptions": {
                "formats": ["html"],
                "waitFor": 1,
                "onlyMainContent": false,
            },
        })))
        .respond_with(accepted(&mock_server, "123"))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_completed_job(
        &mock_server,
        "123",
        2,
        "<html><head><title>COVID-19 data</title></head><body><p>ok</p></body></html>",
    )
    .await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");
    let request = CrawlRequest::from_config("https://www.who.int/data/covid", &config.scrape)
        .expect("Failed to build request");

    let result = client.crawl(request).await.expect("Crawl failed");

    assert!(result.content().contains("<p>ok</p>"));
    assert_eq!(result.title().as_deref(), Some("COVID-19 data"));
    assert_eq!(
        result.select_text("p").expect("Invalid selector"),
        vec!["ok".to_string()]
    );

    let stats = client.stats().snapshot();
    assert_eq!(stats.submissions, 1);
    assert_eq!(stats.polls, 3);
    assert_eq!(stats.completed, 1);
}

#[tokio::test]
async fn test_rate_limit_body_triggers_cooldown_and_resubmission() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Rate limit exceeded. Consumed points: 10, Remaining points: 0",
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(accepted(&mock_server, "abc"))
        .mount(&mock_server)
        .await;

    mount_completed_job(&mock_server, "abc", 0, "<p>after cooldown</p>").await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");

    let result = client
        .crawl(CrawlRequest::new("https://www.cdc.gov/nwss/").unwrap())
        .await
        .expect("Crawl failed");

    assert_eq!(result.content(), "<p>after cooldown</p>");

    let stats = client.stats().snapshot();
    assert_eq!(stats.rate_limited, 1);
    assert_eq!(stats.transient_errors, 0);
    assert_eq!(stats.submissions, 2);
}

#[tokio::test]
async fn test_http_429_is_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "success": false,
            "error": "Too many requests",
        })))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(accepted(&mock_server, "429"))
        .mount(&mock_server)
        .await;

    mount_completed_job(&mock_server, "429", 1, "<p>eventually</p>").await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");

    client
        .crawl(CrawlRequest::new("https://example.com/").unwrap())
        .await
        .expect("Crawl failed");

    let stats = client.stats().snapshot();
    assert_eq!(stats.rate_limited, 2);
    assert_eq!(stats.submissions, 3);
}

#[tokio::test]
async fn test_undecodable_submit_body_is_transient() {
    let mock_server = MockServer::start().await;

    // A proxy error page instead of JSON
    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(
            ResponseTemplate::new(502)
                .set_body_string("<html><body><h1>502 Bad Gateway</h1></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(accepted(&mock_server, "gw"))
        .mount(&mock_server)
        .await;

    mount_completed_job(&mock_server, "gw", 0, "<p>through the gateway</p>").await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");

    let result = client
        .crawl(CrawlRequest::new("https://example.com/").unwrap())
        .await
        .expect("Crawl failed");

    assert_eq!(result.content(), "<p>through the gateway</p>");

    let stats = client.stats().snapshot();
    assert_eq!(stats.transient_errors, 1);
    assert_eq!(stats.rate_limited, 0);
    assert_eq!(stats.submissions, 2);
}

#[tokio::test]
async fn test_accepted_without_reference_is_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(accepted(&mock_server, "ref"))
        .mount(&mock_server)
        .await;

    mount_completed_job(&mock_server, "ref", 0, "<p>referenced</p>").await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");

    client
        .crawl(CrawlRequest::new("https://example.com/").unwrap())
        .await
        .expect("Crawl failed");

    let stats = client.stats().snapshot();
    assert_eq!(stats.transient_errors, 1);
    assert_eq!(stats.submissions, 2);
}

#[tokio::test]
async fn test_rejection_without_marker_is_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Internal server error while queueing job",
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(accepted(&mock_server, "queued"))
        .mount(&mock_server)
        .await;

    mount_completed_job(&mock_server, "queued", 0, "<p>queued</p>").await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");

    client
        .crawl(CrawlRequest::new("https://example.com/").unwrap())
        .await
        .expect("Crawl failed");

    let stats = client.stats().snapshot();
    assert_eq!(stats.transient_errors, 1);
    assert_eq!(stats.rate_limited, 0);
}

#[tokio::test]
async fn test_poll_429_repolls_same_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(accepted(&mock_server, "busy"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/busy"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    mount_completed_job(&mock_server, "busy", 0, "<p>after 429</p>").await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");

    let result = client
        .crawl(CrawlRequest::new("https://example.com/").unwrap())
        .await
        .expect("Crawl failed");

    assert_eq!(result.content(), "<p>after 429</p>");

    let stats = client.stats().snapshot();
    assert_eq!(stats.rate_limited, 1);
    assert_eq!(stats.submissions, 1);
    assert_eq!(stats.polls, 2);
}

#[tokio::test]
async fn test_unknown_job_on_poll_is_permanent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(accepted(&mock_server, "gone"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": "Job not found",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");

    let error = client
        .crawl(CrawlRequest::new("https://example.com/").unwrap())
        .await
        .expect_err("Crawl should fail");

    assert!(matches!(error, CrawlError::Permanent { .. }));
    assert!(error.to_string().contains("http_404"));
    assert_eq!(client.stats().snapshot().permanent_failures, 1);
}

#[tokio::test]
async fn test_errored_job_fails_permanently_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(accepted(&mock_server, "dead"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/dead"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "errored",
            "error": "Page failed to load",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");

    let error = client
        .crawl(CrawlRequest::new("https://example.com/broken").unwrap())
        .await
        .expect_err("Crawl should fail");

    assert!(matches!(error, CrawlError::Permanent { .. }));
    assert!(error.to_string().contains("Page failed to load"));
    assert_eq!(client.stats().snapshot().permanent_failures, 1);
}

#[tokio::test]
async fn test_completed_without_data_is_permanent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(accepted(&mock_server, "empty"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "data": [],
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");

    let error = client
        .crawl(CrawlRequest::new("https://example.com/").unwrap())
        .await
        .expect_err("Crawl should fail");

    assert!(matches!(error, CrawlError::Permanent { .. }));
}

#[tokio::test]
async fn test_server_error_on_poll_repolls_same_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(accepted(&mock_server, "flaky"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/flaky"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    mount_completed_job(&mock_server, "flaky", 0, "<p>recovered</p>").await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");

    let result = client
        .crawl(CrawlRequest::new("https://example.com/").unwrap())
        .await
        .expect("Crawl failed");

    assert_eq!(result.content(), "<p>recovered</p>");
    assert_eq!(client.stats().snapshot().transient_errors, 1);
}

#[tokio::test]
async fn test_poll_url_scheme_follows_endpoint() {
    let mock_server = MockServer::start().await;
    let https_poll_url = mock_server.uri().replacen("http://", "https://", 1) + "/v1/crawl/tls";

    // Self-hosted deployments behind plain HTTP still advertise https poll URLs
    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "url": https_poll_url,
        })))
        .mount(&mock_server)
        .await;

    mount_completed_job(&mock_server, "tls", 0, "<p>plain http</p>").await;

    let config = create_test_config(&mock_server);
    let client = CrawlClient::from_config(&config).expect("Failed to create client");

    let result = client
        .crawl(CrawlRequest::new("https://example.com/").unwrap())
        .await
        .expect("Crawl failed");

    assert_eq!(result.content(), "<p>plain http</p>");
}

#[tokio::test]
async fn test_polling_is_idempotent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(accepted(&mock_server, "same"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/same"))
        .respond_with(status("scraping"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server);
    let service = FirecrawlService::new(&config.service).expect("Failed to create service");

    let handle = service
        .submit(&CrawlRequest::new("https://example.com/").unwrap())
        .await
        .expect("Submission failed");

    let first = service.poll(&handle).await.expect("Poll failed");
    let second = service.poll(&handle).await.expect("Poll failed");

    assert!(matches!(first, PollOutcome::Scraping));
    assert!(matches!(second, PollOutcome::Scraping));
}

#[tokio::test]
async fn test_batch_preserves_input_order() {
    let mock_server = MockServer::start().await;
    let pages = [
        ("https://a.example.com/", "a", 3),
        ("https://b.example.com/", "b", 0),
        ("https://c.example.com/", "c", 1),
    ];

    for (url, id, scraping_polls) in pages {
        Mock::given(method("POST"))
            .and(path("/v1/crawl"))
            .and(body_partial_json(json!({ "url": url })))
            .respond_with(accepted(&mock_server, id))
            .mount(&mock_server)
            .await;

        mount_completed_job(&mock_server, id, scraping_polls, &format!("<p>{}</p>", id)).await;
    }

    let config = create_test_config(&mock_server);
    let runner = BatchRunner::from_config(&config).expect("Failed to create runner");
    let requests = pages
        .iter()
        .map(|(url, _, _)| CrawlRequest::new(url).unwrap())
        .collect();

    let results = runner.run_all(requests).await.expect("Batch failed");

    let contents: Vec<&str> = results.iter().map(|r| r.content()).collect();
    assert_eq!(contents, vec!["<p>a</p>", "<p>b</p>", "<p>c</p>"]);
    assert_eq!(runner.client().stats().snapshot().completed, 3);
}

#[tokio::test]
async fn test_empty_batch_sends_no_requests() {
    let mock_server = MockServer::start().await;

    let config = create_test_config(&mock_server);
    let runner = BatchRunner::from_config(&config).expect("Failed to create runner");

    let results = runner.run_all(Vec::new()).await.expect("Batch failed");

    assert!(results.is_empty());
    let received = mock_server
        .received_requests()
        .await
        .expect("Request recording disabled");
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_missing_api_key_is_rejected() {
    let mock_server = MockServer::start().await;

    let mut config = create_test_config(&mock_server);
    config.service.api_key = None;

    assert!(CrawlClient::from_config(&config).is_err());
}
