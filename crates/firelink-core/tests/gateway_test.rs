#![allow(clippy::unwrap_used)]
// Integration tests for `CommandGateway` using wiremock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use firelink_api::{Transport, requests};
use firelink_core::{Command, CommandGateway, CommandKey, CommandStatus, Confirm, Session};

// ── Helpers ─────────────────────────────────────────────────────────

/// Answers every prompt the same way and records what was asked.
struct RecordingConfirm {
    answer: bool,
    prompts: Mutex<Vec<String>>,
}

impl RecordingConfirm {
    fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirm for RecordingConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        self.answer
    }
}

async fn setup(
    confirm: Arc<RecordingConfirm>,
    timeout: Duration,
) -> (MockServer, CommandGateway, Url) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let transport = Transport::with_client(reqwest::Client::new(), timeout);
    let gateway = CommandGateway::new(transport, Session::default(), confirm);
    (server, gateway, base)
}

// ── Confirmation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_declined_confirmation_sends_nothing() {
    let confirm = RecordingConfirm::new(false);
    let (server, gateway, base) = setup(confirm.clone(), Duration::from_secs(5)).await;

    Mock::given(method("POST"))
        .and(path("/lock"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let key = CommandKey::new("lock");
    let result = gateway
        .execute(&key, &base, &requests::set_lock(true), "Lock hardware?", true)
        .await;

    assert!(result.is_none());
    assert!(!gateway.statuses().contains(&key));
    assert_eq!(gateway.statuses().get(&key), CommandStatus::Idle);
    assert!(!gateway.session().error_occurred());
    assert_eq!(confirm.prompts(), ["Lock hardware?"]);
}

#[tokio::test]
async fn test_declined_confirmation_keeps_previous_status() {
    let confirm = RecordingConfirm::new(false);
    let (_server, gateway, base) = setup(confirm, Duration::from_secs(5)).await;

    let key = CommandKey::new("play");
    gateway.statuses().set(&key, CommandStatus::Failure);
    gateway
        .execute(&key, &base, &requests::testloop(), "Run testloop?", true)
        .await;

    assert_eq!(gateway.statuses().get(&key), CommandStatus::Failure);
}

#[tokio::test]
async fn test_no_prompt_when_not_asking() {
    let confirm = RecordingConfirm::new(false);
    let (server, gateway, base) = setup(confirm.clone(), Duration::from_secs(5)).await;

    Mock::given(method("POST"))
        .and(path("/testloop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let key = CommandKey::new("testloop");
    let result = gateway
        .execute(&key, &base, &requests::testloop(), "Run testloop?", false)
        .await;

    assert_eq!(result, Some(json!({})));
    assert!(confirm.prompts().is_empty());
}

#[tokio::test]
async fn test_schedule_prompts_even_when_confirmation_is_off() {
    let confirm = RecordingConfirm::new(true);
    let (server, gateway, base) = setup(confirm.clone(), Duration::from_secs(5)).await;
    gateway.session().set_ask_confirmation(false);

    Mock::given(method("POST"))
        .and(path("/program/control"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    gateway.send(&Command::Play, &base, None).await;
    assert!(confirm.prompts().is_empty());

    let schedule = Command::Schedule {
        time: "2024-05-02T09:00:00.000".into(),
    };
    gateway.send(&schedule, &base, None).await;
    assert_eq!(
        confirm.prompts(),
        ["Schedule program for 2024-05-02T09:00:00.000?"]
    );
}

// ── Status lifecycle ────────────────────────────────────────────────

#[tokio::test]
async fn test_pending_is_visible_before_response() {
    let confirm = RecordingConfirm::new(true);
    let (server, gateway, base) = setup(confirm, Duration::from_secs(5)).await;

    Mock::given(method("POST"))
        .and(path("/reboot"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let key = CommandKey::for_device("reboot", "dev1");
    let task = {
        let gateway = gateway.clone();
        let key = key.clone();
        tokio::spawn(async move {
            gateway
                .execute(&key, &base, &requests::reboot(), "Reboot device?", false)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(gateway.statuses().get(&key), CommandStatus::Pending);

    assert!(task.await.unwrap().is_some());
    assert_eq!(gateway.statuses().get(&key), CommandStatus::Success);
}

#[tokio::test]
async fn test_success_status_is_sticky() {
    let confirm = RecordingConfirm::new(true);
    let (server, gateway, base) = setup(confirm, Duration::from_secs(5)).await;

    Mock::given(method("POST"))
        .and(path("/lock"))
        .and(body_json(json!({"is_locked": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let result = gateway.send(&Command::Unlock, &base, None).await;
    assert_eq!(result, Some(json!({"ok": true})));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        gateway.statuses().get(&CommandKey::new("unlock")),
        CommandStatus::Success
    );
}

#[tokio::test]
async fn test_http_error_is_failure_and_raises_banner() {
    let confirm = RecordingConfirm::new(true);
    let (server, gateway, base) = setup(confirm, Duration::from_secs(5)).await;

    Mock::given(method("POST"))
        .and(path("/program/control"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"error": "No program loaded"})),
        )
        .mount(&server)
        .await;

    let result = gateway.send(&Command::Play, &base, None).await;

    assert!(result.is_none());
    assert_eq!(
        gateway.statuses().get(&CommandKey::new("play")),
        CommandStatus::Failure
    );
    assert!(gateway.session().error_occurred());
    assert!(gateway.session().last_error().unwrap().starts_with("play:"));
}

#[tokio::test]
async fn test_timeout_is_failure() {
    let confirm = RecordingConfirm::new(true);
    let (server, gateway, base) = setup(confirm, Duration::from_millis(100)).await;

    Mock::given(method("POST"))
        .and(path("/shutdown"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let result = gateway.send(&Command::Shutdown, &base, Some("dev1")).await;

    assert!(result.is_none());
    assert_eq!(
        gateway
            .statuses()
            .get(&CommandKey::for_device("shutdown", "dev1")),
        CommandStatus::Failure
    );
}

#[tokio::test]
async fn test_failure_then_success_overwrites_status() {
    let confirm = RecordingConfirm::new(true);
    let (server, gateway, base) = setup(confirm, Duration::from_secs(5)).await;

    Mock::given(method("POST"))
        .and(path("/testloop"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/testloop"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let key = CommandKey::new("testloop");
    assert!(gateway.send(&Command::Testloop, &base, None).await.is_none());
    assert_eq!(gateway.statuses().get(&key), CommandStatus::Failure);

    // Empty 2xx body still counts as success.
    assert_eq!(
        gateway.send(&Command::Testloop, &base, None).await,
        Some(serde_json::Value::Null)
    );
    assert_eq!(gateway.statuses().get(&key), CommandStatus::Success);
}
