//! Tests for the HTTP transport module

use super::*;
use crate::connector::{RawResponse, RequestSpec};
use crate::error::{Error, FailureKind};
use crate::types::Method;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> HttpTransport {
    HttpTransport::with_config(HttpTransportConfig::default().with_rate_limit(None)).unwrap()
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_classify_success() {
    assert!(classify_status(&RawResponse::new(200, "{}")).is_ok());
    assert!(classify_status(&RawResponse::new(204, "")).is_ok());
}

#[test]
fn test_classify_retryable() {
    for status in [429, 500, 502, 503, 504] {
        let err = classify_status(&RawResponse::new(status, "")).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Retryable, "status {status}");
    }
}

#[test]
fn test_classify_non_retryable() {
    for status in [400, 401, 403, 404] {
        let err = classify_status(&RawResponse::new(status, "denied")).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NonRetryable, "status {status}");
    }
}

#[test]
fn test_classify_truncates_long_body() {
    let body = "é".repeat(300);
    let err = classify_status(&RawResponse::new(403, body)).unwrap_err();
    assert!(err.to_string().len() < 300);
}

#[test]
fn test_transport_config_default() {
    let config = HttpTransportConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("auditpull/"));
}

// ============================================================================
// HttpTransport
// ============================================================================

#[tokio::test]
async fn test_send_form_post_with_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/team.accessLogs"))
        .and(header("Authorization", "Bearer xoxp-1234"))
        .and(body_string_contains("before=1422922864"))
        .and(body_string_contains("page=2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = RequestSpec::new(
        Method::POST,
        format!("{}/api/team.accessLogs", mock_server.uri()),
    )
    .header("Authorization", "Bearer xoxp-1234")
    .form("before", "1422922864")
    .form("page", "2");

    let response = transport().send(&request).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["ok"], true);
}

#[tokio::test]
async fn test_send_get_with_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/logs"))
        .and(query_param("since", "2015-02-03T00:21:04Z"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let request = RequestSpec::new(Method::GET, format!("{}/logs", mock_server.uri()))
        .query("since", "2015-02-03T00:21:04Z");

    let response = transport().send(&request).await.unwrap();
    assert_eq!(response.body, "[]");
}

#[tokio::test]
async fn test_send_returns_error_status_as_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let request = RequestSpec::new(Method::GET, mock_server.uri());
    let response = transport().send(&request).await.unwrap();
    assert_eq!(response.status, 503);
    assert_eq!(
        classify_status(&response).unwrap_err().kind(),
        FailureKind::Retryable
    );
}

#[tokio::test]
async fn test_send_timeout_is_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::with_config(
        HttpTransportConfig::default()
            .with_rate_limit(None)
            .with_timeout(Duration::from_millis(100)),
    )
    .unwrap();

    let request = RequestSpec::new(Method::GET, mock_server.uri());
    let err = transport.send(&request).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_send_connection_dropped_is_retryable() {
    use tokio::io::AsyncReadExt;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        // Hang up without answering
        drop(socket);
    });

    let request = RequestSpec::new(Method::POST, format!("http://{addr}/team.accessLogs"))
        .form("page", "1");
    let err = transport().send(&request).await.unwrap_err();
    server.await.unwrap();

    assert_eq!(err.kind(), FailureKind::Retryable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_send_invalid_url() {
    let request = RequestSpec::new(Method::GET, "not a url");
    let err = transport().send(&request).await.unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[tokio::test]
async fn test_rate_limited_transport_still_sends() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::with_config(
        HttpTransportConfig::default().with_rate_limit(Some(RateLimiterConfig::new(100, 10))),
    )
    .unwrap();
    assert!(transport.has_rate_limiter());

    let request = RequestSpec::new(Method::GET, mock_server.uri());
    for _ in 0..3 {
        transport.send(&request).await.unwrap();
    }
}
