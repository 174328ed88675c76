#![allow(clippy::unwrap_used)]
// Integration tests for `Transport` and the event-stream client using wiremock.

use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use firelink_api::{EventStreamHandle, Error, Transport, requests};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Transport, Url) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let transport = Transport::with_client(reqwest::Client::new(), Duration::from_secs(5));
    (server, transport, base)
}

// ── Request/response ────────────────────────────────────────────────

#[tokio::test]
async fn test_get_returns_parsed_json() {
    let (server, transport, base) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dev1": {}})))
        .mount(&server)
        .await;

    let value = transport.send(&base, &requests::list_devices()).await.unwrap();
    assert_eq!(value, json!({"dev1": {}}));
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let (server, transport, base) = setup().await;

    Mock::given(method("POST"))
        .and(path("/lock"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"is_locked": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    transport.send(&base, &requests::set_lock(false)).await.unwrap();
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let (server, transport, base) = setup().await;

    Mock::given(method("POST"))
        .and(path("/deregister-all"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let value = transport
        .send(&base, &requests::deregister_all())
        .await
        .unwrap();
    assert!(value.is_null());
}

#[tokio::test]
async fn test_http_error_keeps_status_and_body() {
    let (server, transport, base) = setup().await;

    Mock::given(method("POST"))
        .and(path("/fire"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Device is locked"})),
        )
        .mount(&server)
        .await;

    let err = transport
        .send(&base, &requests::fire('a', 1))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.remote_message(), Some("Device is locked"));
}

#[tokio::test]
async fn test_http_error_with_non_json_body() {
    let (server, transport, base) = setup().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let result = transport.send(&base, &requests::search()).await;
    assert!(
        matches!(result, Err(Error::Http { status: 502, body: None })),
        "expected Http error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_invalid_json_success_is_deserialization_error() {
    let (server, transport, base) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = transport.send(&base, &requests::list_devices()).await;
    assert!(
        matches!(result, Err(Error::Deserialization { ref body, .. }) if body == "not json"),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let transport = Transport::with_client(reqwest::Client::new(), Duration::from_millis(100));

    Mock::given(method("POST"))
        .and(path("/reboot"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = transport.send(&base, &requests::reboot()).await.unwrap_err();
    assert!(err.is_timeout(), "expected Timeout, got: {err:?}");
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let transport = Transport::with_client(reqwest::Client::new(), Duration::from_secs(5));
    // Port 9 on localhost is not served in the test environment.
    let base = Url::parse("http://127.0.0.1:9").unwrap();

    let result = transport.send(&base, &requests::shutdown()).await;
    assert!(
        matches!(result, Err(Error::Network(_))),
        "expected Network error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_send_typed_deregister_response() {
    let (server, transport, base) = setup().await;

    Mock::given(method("POST"))
        .and(path("/deregister"))
        .and(body_json(json!({"device_id": "dev1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"deregistered_device_id": "dev1"})),
        )
        .mount(&server)
        .await;

    let resp: firelink_api::DeregisterResponse = transport
        .send_typed(&base, &requests::deregister("dev1"))
        .await
        .unwrap();
    assert_eq!(resp.deregistered_device_id, "dev1");
}

// ── Event stream ────────────────────────────────────────────────────

#[tokio::test]
async fn test_event_stream_delivers_messages_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("retry: 50\ndata: {\"n\":1}\n\ndata: {\"n\":2}\n\n"),
        )
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/event-stream", server.uri())).unwrap();
    let mut handle = EventStreamHandle::connect(reqwest::Client::new(), url, CancellationToken::new());

    let first = tokio::time::timeout(Duration::from_secs(5), handle.recv())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), handle.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.data, "{\"n\":1}");
    assert_eq!(second.data, "{\"n\":2}");
}

#[tokio::test]
async fn test_event_stream_reconnects_after_close() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("retry: 20\nid: 7\ndata: tick\n\n"),
        )
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/event-stream", server.uri())).unwrap();
    let mut handle = EventStreamHandle::connect(reqwest::Client::new(), url, CancellationToken::new());

    // Each connection yields one message; a second one proves a reconnect happened.
    for _ in 0..2 {
        let message = tokio::time::timeout(Duration::from_secs(5), handle.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.data, "tick");
        assert_eq!(message.id.as_deref(), Some("7"));
    }

    handle.shutdown();
    handle.shutdown();
    assert!(handle.is_shut_down());
}
