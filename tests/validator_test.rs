// Validator probes against a local mock server: success, failure, the
// ranged-GET fallback for HEAD-hostile hosts, and outcome caching.

use std::sync::Arc;
use std::time::Duration;

use linkpipe::cache::CacheManager;
use linkpipe::config::PipelineConfig;
use linkpipe::validate::LinkValidator;

fn validator_for(base_url: &str) -> LinkValidator {
    let config = Arc::new(
        PipelineConfig::builder()
            .base_url(base_url)
            .build()
            .expect("config"),
    );
    let cache = Arc::new(CacheManager::new(
        config.max_cache_entries(),
        config.validation_ttl(),
        config.processing_ttl(),
        None,
    ));
    LinkValidator::new(config, cache).expect("validator")
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn reachable_external_url_is_valid() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("HEAD", "/ok")
        .with_status(200)
        .create_async()
        .await;

    let validator = validator_for("https://docs.example.com");
    let result = validator
        .validate(&format!("{}/ok", server.url()), PROBE_TIMEOUT)
        .await;

    assert!(result.is_valid);
    assert_eq!(result.status, Some(200));
    assert!(result.error.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_external_url_is_invalid_with_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", "/gone")
        .with_status(404)
        .create_async()
        .await;

    let validator = validator_for("https://docs.example.com");
    let result = validator
        .validate(&format!("{}/gone", server.url()), PROBE_TIMEOUT)
        .await;

    assert!(!result.is_valid);
    assert_eq!(result.status, Some(404));
    assert!(result.error.is_some());
}

#[tokio::test]
async fn head_rejection_falls_back_to_ranged_get() {
    let mut server = mockito::Server::new_async().await;
    let head = server
        .mock("HEAD", "/no-head")
        .with_status(405)
        .create_async()
        .await;
    let get = server
        .mock("GET", "/no-head")
        .match_header("range", "bytes=0-0")
        .with_status(206)
        .create_async()
        .await;

    let validator = validator_for("https://docs.example.com");
    let result = validator
        .validate(&format!("{}/no-head", server.url()), PROBE_TIMEOUT)
        .await;

    assert!(result.is_valid);
    assert_eq!(result.status, Some(206));
    head.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn connection_failure_is_invalid_not_a_panic() {
    // Reserved port with nothing listening
    let validator = validator_for("https://docs.example.com");
    let result = validator
        .validate("http://127.0.0.1:9/down", PROBE_TIMEOUT)
        .await;

    assert!(!result.is_valid);
    assert!(result.status.is_none());
    assert!(result.error.is_some());
}

#[tokio::test]
async fn hung_server_reports_an_explicit_timeout() {
    // A listener that accepts connections but never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let hold = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    let validator = validator_for("https://docs.example.com");
    let result = validator
        .validate(&format!("http://{addr}/slow"), Duration::from_millis(250))
        .await;

    assert!(!result.is_valid);
    assert!(result.status.is_none());
    let error = result.error.expect("error message");
    assert!(error.contains("timeout"), "unexpected error: {error}");
    hold.abort();
}

#[tokio::test]
async fn root_relative_link_probes_the_site_origin() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("HEAD", "/docs/setup")
        .with_status(200)
        .create_async()
        .await;

    let validator = validator_for(&server.url());
    let result = validator.validate("/docs/setup", PROBE_TIMEOUT).await;

    assert!(result.is_valid);
    mock.assert_async().await;
}

#[tokio::test]
async fn relative_and_absolute_forms_share_one_cache_entry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("HEAD", "/docs/a")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let validator = validator_for(&server.url());

    // The root-relative reference caches under its resolved form, so the
    // absolute form is served without a second probe
    assert!(validator.validate("/docs/a", PROBE_TIMEOUT).await.is_valid);
    assert!(
        validator
            .validate(&format!("{}/docs/a", server.url()), PROBE_TIMEOUT)
            .await
            .is_valid
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn second_validation_is_served_from_cache() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("HEAD", "/cached")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let validator = validator_for("https://docs.example.com");
    let url = format!("{}/cached", server.url());

    let first = validator.validate(&url, PROBE_TIMEOUT).await;
    let second = validator.validate(&url, PROBE_TIMEOUT).await;

    assert!(first.is_valid);
    assert_eq!(first.validated_at, second.validated_at);
    mock.assert_async().await;
}

#[tokio::test]
async fn failed_validations_are_cached_too() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("HEAD", "/flaky")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let validator = validator_for("https://docs.example.com");
    let url = format!("{}/flaky", server.url());

    assert!(!validator.validate(&url, PROBE_TIMEOUT).await.is_valid);
    // A failing link is not hammered with a second probe
    assert!(!validator.validate(&url, PROBE_TIMEOUT).await.is_valid);
    mock.assert_async().await;
}

#[tokio::test]
async fn batch_validation_returns_every_url() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", "/a")
        .with_status(200)
        .create_async()
        .await;
    server
        .mock("HEAD", "/b")
        .with_status(404)
        .create_async()
        .await;

    let validator = validator_for("https://docs.example.com");
    let urls = vec![
        format!("{}/a", server.url()),
        format!("{}/b", server.url()),
        "mailto:a@b.com".to_string(),
    ];

    let results = validator.validate_batch(urls.clone(), 2, PROBE_TIMEOUT).await;
    assert_eq!(results.len(), 3);

    let by_url: std::collections::HashMap<_, _> = results.into_iter().collect();
    assert!(by_url[&urls[0]].is_valid);
    assert!(!by_url[&urls[1]].is_valid);
    assert!(by_url[&urls[2]].is_valid);
}

#[tokio::test]
async fn prevalidate_warms_the_cache_in_the_background() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("HEAD", "/warm")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let validator = validator_for("https://docs.example.com");
    let url = format!("{}/warm", server.url());

    let handle = validator.prevalidate(vec![url.clone()], vec![url.clone()]);
    handle.await.expect("background task");

    // The later foreground validation hits the cache, not the server
    assert!(validator.validate(&url, PROBE_TIMEOUT).await.is_valid);
    mock.assert_async().await;
}
