// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - HTTP Client Tests
 * Response capture, redirect modes, body cap, charset handling and retries
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use lonkero_recon::errors::{NetworkError, ReconError};
use lonkero_recon::http_client::{HttpClient, RedirectMode, Transport, MAX_BODY_SIZE};
use lonkero_recon::config::ProxyConfig;
use lonkero_recon::retry::SprayPolicy;
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn test_get_captures_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Server", "nginx")
                .set_body_string("<html><head><title>Example</title></head></html>"),
        )
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(10, 0).unwrap();
    let url = format!("{}/", mock_server.uri());
    let response = client.get(&url).await.unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(response.title, "Example");
    assert_eq!(response.headers.get("server").map(String::as_str), Some("nginx"));
    assert_eq!(response.content_length, response.raw_body.len() as u64);

    let raw_header = String::from_utf8_lossy(&response.raw_header);
    assert!(raw_header.contains(" 200 "));
    assert!(raw_header.to_lowercase().contains("server: nginx"));
    assert!(response.raw.ends_with(&response.raw_body));
}

#[tokio::test]
async fn test_non_2xx_is_an_answer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(10, 3).unwrap();
    let response = client
        .get(&format!("{}/missing", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status_code, 404);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let retry = SprayPolicy {
        retries: 4,
        wait_min: Duration::from_millis(1),
        wait_max: Duration::from_millis(2),
    };
    let client = HttpClient::with_config(5, retry, true, &ProxyConfig::None).unwrap();
    let response = client
        .get(&format!("{}/busy", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status_code, 503);
    assert_eq!(response.body, "try later");
}

#[tokio::test]
async fn test_redirect_modes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/end"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/end"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(10, 0).unwrap();
    let url = format!("{}/start", mock_server.uri());

    let followed = client.fetch(&url, RedirectMode::Follow).await.unwrap();
    assert_eq!(followed.status_code, 200);
    assert_eq!(followed.body, "done");
    assert!(followed.url.ends_with("/end"));

    let direct = client.fetch(&url, RedirectMode::None).await.unwrap();
    assert_eq!(direct.status_code, 302);
    assert_eq!(direct.headers.get("location").map(String::as_str), Some("/end"));
}

#[tokio::test]
async fn test_redirect_loop_returns_last_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(10, 0).unwrap();
    let response = client
        .get(&format!("{}/loop", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status_code, 302);
}

#[tokio::test]
async fn test_body_is_capped() {
    let mock_server = MockServer::start().await;

    let big = vec![b'a'; MAX_BODY_SIZE + 512 * 1024];
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(big))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(10, 0).unwrap();
    let response = client
        .get(&format!("{}/big", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.raw_body.len(), MAX_BODY_SIZE);
    assert_eq!(response.body.len(), MAX_BODY_SIZE);
}

#[tokio::test]
async fn test_legacy_charset_body_is_normalized() {
    let mock_server = MockServer::start().await;

    // "<title>你好</title>" in GBK
    let mut body = b"<title>".to_vec();
    body.extend_from_slice(&[0xC4, 0xE3, 0xBA, 0xC3]);
    body.extend_from_slice(b"</title>");

    Mock::given(method("GET"))
        .and(path("/gbk"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(10, 0).unwrap();
    let response = client
        .get(&format!("{}/gbk", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.title, "你好");
    assert_eq!(response.raw_body, body);
}

#[tokio::test]
async fn test_connection_failure_is_retried_then_reported() {
    // Grab a free port, then close it so nothing listens there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let retry = SprayPolicy {
        retries: 2,
        wait_min: Duration::from_millis(10),
        wait_max: Duration::from_millis(20),
    };
    let client = HttpClient::with_config(2, retry, true, &ProxyConfig::None).unwrap();

    let result = client.get(&format!("http://127.0.0.1:{}/", port)).await;

    match result {
        Err(ReconError::Network(e)) => assert!(e.is_retryable()),
        other => panic!("expected network error, got {:?}", other.map(|r| r.status_code)),
    }
}

#[tokio::test]
async fn test_empty_url_rejected() {
    let client = HttpClient::new(10, 0).unwrap();
    let err = client.get("").await.unwrap_err();
    assert!(matches!(
        err,
        ReconError::Network(NetworkError::InvalidUrl { .. })
    ));
}
