//! Tests for the HTTP fetch module

use super::*;
use crate::auth::Session;
use crate::error::Error;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> FetcherConfig {
    FetcherConfig::builder()
        .timeout(Duration::from_secs(5))
        .backoff(BackoffPolicy::new(
            Duration::from_millis(1),
            Duration::from_millis(1),
        ))
        .build()
}

fn fetcher_for(server: &MockServer) -> (RateLimitedFetcher, Url) {
    let base = Url::parse(&format!("{}/api/v1", server.uri())).unwrap();
    let fetcher = RateLimitedFetcher::new(&base, fast_config()).unwrap();
    let url = Url::parse(&format!("{}/api/v1/apis/categories?page=1", server.uri())).unwrap();
    (fetcher, url)
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": token
        })))
        .mount(server)
        .await;
}

#[test]
fn test_fetcher_config_default() {
    let config = FetcherConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.backoff, BackoffPolicy::default());
    assert!(config.rate_limit.is_none());
    assert!(config.user_agent.starts_with("catalog-harvest/"));
}

#[test]
fn test_fetcher_config_builder() {
    let config = FetcherConfig::builder()
        .timeout(Duration::from_secs(3))
        .rate_limit(RateLimiterConfig::new(2, 1))
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.timeout, Duration::from_secs(3));
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::new(2, 1)));
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[tokio::test]
async fn test_fetch_attaches_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apis/categories"))
        .and(header("Authorization", "Bearer my-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "categories": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (fetcher, url) = fetcher_for(&server);
    let session = Session::new(3).with_token("my-token");
    let outcome = fetcher.fetch(&url, session).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.session().current_token(), Some("my-token"));
}

#[tokio::test]
async fn test_fetch_without_token_sends_no_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apis/categories"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (fetcher, url) = fetcher_for(&server);
    let outcome = fetcher.fetch(&url, Session::new(3)).await.unwrap();
    assert!(outcome.is_success());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_fetch_retries_after_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apis/categories"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apis/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "categories": ["a"]
        })))
        .mount(&server)
        .await;

    let (fetcher, url) = fetcher_for(&server);
    let outcome = fetcher.fetch(&url, Session::new(5)).await.unwrap();

    let FetchOutcome::Success { response, session } = outcome else {
        panic!("expected success");
    };
    assert_eq!(response.status(), 200);
    assert!(!session.is_authenticated());

    // Rate limits never trigger renewal
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert!(requests
        .iter()
        .all(|r| r.url.path() == "/api/v1/apis/categories"));
}

#[tokio::test]
async fn test_fetch_renews_token_after_auth_failure() {
    let server = MockServer::start().await;
    mount_token(&server, "new-token").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apis/categories"))
        .and(header("Authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "categories": ["a"]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apis/categories"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (fetcher, url) = fetcher_for(&server);
    let session = Session::new(5).with_token("stale-token");
    let outcome = fetcher.fetch(&url, session).await.unwrap();

    let FetchOutcome::Success { response, session } = outcome else {
        panic!("expected success");
    };
    assert_eq!(response.status(), 200);
    assert_eq!(session.current_token(), Some("new-token"));

    let requests = server.received_requests().await.unwrap();
    let api_calls: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/api/v1/apis/categories")
        .collect();
    assert_eq!(api_calls.len(), 2);
    assert_eq!(
        api_calls[0].headers.get("authorization").unwrap(),
        "Bearer stale-token"
    );
    assert_eq!(
        api_calls[1].headers.get("authorization").unwrap(),
        "Bearer new-token"
    );
}

#[tokio::test]
async fn test_fetch_exhausted_on_persistent_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apis/categories"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let (fetcher, url) = fetcher_for(&server);
    let outcome = fetcher.fetch(&url, Session::new(3)).await.unwrap();

    match outcome {
        FetchOutcome::Exhausted {
            attempts,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert!(matches!(last_error, Error::RateLimited { .. }));
        }
        FetchOutcome::Success { .. } => panic!("expected exhaustion"),
    }
}

#[tokio::test]
async fn test_fetch_exhausted_when_renewal_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "nope": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apis/categories"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let (fetcher, url) = fetcher_for(&server);
    let session = Session::new(2).with_token("rejected");
    let outcome = fetcher.fetch(&url, session).await.unwrap();

    match outcome {
        FetchOutcome::Exhausted {
            last_error,
            session,
            ..
        } => {
            assert!(matches!(last_error, Error::Auth { .. }), "{last_error:?}");
            // The rejected token is dropped rather than resent
            assert!(!session.is_authenticated());
        }
        FetchOutcome::Success { .. } => panic!("expected exhaustion"),
    }

    let requests = server.received_requests().await.unwrap();
    let api_calls: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/api/v1/apis/categories")
        .collect();
    assert!(!api_calls[1].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_throttled_fetcher_spaces_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apis/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "categories": []
        })))
        .expect(3)
        .mount(&server)
        .await;

    let base = Url::parse(&format!("{}/api/v1", server.uri())).unwrap();
    let config = FetcherConfig::builder()
        .rate_limit(RateLimiterConfig::new(20, 1))
        .build();
    let fetcher = RateLimitedFetcher::new(&base, config).unwrap();
    let url = Url::parse(&format!("{}/api/v1/apis/categories?page=1", server.uri())).unwrap();

    let start = std::time::Instant::now();
    for _ in 0..3 {
        let outcome = fetcher.fetch(&url, Session::new(1)).await.unwrap();
        assert!(outcome.is_success());
    }

    // One token up front, then one every 50ms
    assert!(start.elapsed() >= Duration::from_millis(90));
}

#[tokio::test]
async fn test_fetch_treats_non_200_success_as_auth_failure() {
    let server = MockServer::start().await;
    mount_token(&server, "fresh").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apis/categories"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "categories": ["a"]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apis/categories"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (fetcher, url) = fetcher_for(&server);
    let outcome = fetcher.fetch(&url, Session::new(3)).await.unwrap();

    let FetchOutcome::Success { response, session } = outcome else {
        panic!("expected success after renewal");
    };
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(session.current_token(), Some("fresh"));

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
    assert_eq!(
        paths,
        vec![
            "/api/v1/apis/categories",
            "/api/v1/auth/token",
            "/api/v1/apis/categories"
        ]
    );
}
