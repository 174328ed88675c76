// ── Request builders ──
//
// One constructor per endpoint. Paths are absolute and get appended to
// either the master base URL or a device host (`http://{ip}:{port}`).

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A fully described request, independent of which host it is sent to.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: &'static str,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn get(path: &'static str) -> Self {
        Self {
            method: Method::GET,
            path,
            body: None,
        }
    }

    fn post(path: &'static str, body: Value) -> Self {
        Self {
            method: Method::POST,
            path,
            body: Some(body),
        }
    }
}

/// Actions accepted by `POST /program/control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramAction {
    Run,
    Pause,
    Continue,
    Stop,
    Schedule,
    Unschedule,
}

// ── Discovery / roster ─────────────────────────────────────────────

pub fn list_devices() -> ApiRequest {
    ApiRequest::get("/devices")
}

pub fn search() -> ApiRequest {
    ApiRequest::get("/search")
}

pub fn deregister(device_id: &str) -> ApiRequest {
    ApiRequest::post("/deregister", json!({ "device_id": device_id }))
}

pub fn deregister_all() -> ApiRequest {
    ApiRequest::post("/deregister-all", json!({}))
}

// ── Hardware / system ──────────────────────────────────────────────

pub fn set_lock(is_locked: bool) -> ApiRequest {
    ApiRequest::post("/lock", json!({ "is_locked": is_locked }))
}

pub fn shutdown() -> ApiRequest {
    ApiRequest::post("/shutdown", json!({}))
}

pub fn reboot() -> ApiRequest {
    ApiRequest::post("/reboot", json!({}))
}

pub fn testloop() -> ApiRequest {
    ApiRequest::post("/testloop", json!({}))
}

pub fn update() -> ApiRequest {
    ApiRequest::post("/update", json!({}))
}

pub fn fire(letter: char, number: u32) -> ApiRequest {
    ApiRequest::post(
        "/fire",
        json!({ "letter": letter.to_string(), "number": number }),
    )
}

// ── Program ────────────────────────────────────────────────────────

pub fn upload_program(name: &str, event_list: Value) -> ApiRequest {
    ApiRequest::post(
        "/program",
        json!({ "name": name, "event_list": event_list }),
    )
}

pub fn delete_program() -> ApiRequest {
    ApiRequest {
        method: Method::DELETE,
        path: "/program",
        body: Some(json!({})),
    }
}

/// `time` is only sent with [`ProgramAction::Schedule`].
pub fn program_control(action: ProgramAction, time: Option<&str>) -> ApiRequest {
    let mut body = json!({ "action": action });
    if let Some(time) = time {
        body["time"] = Value::String(time.to_owned());
    }
    ApiRequest::post("/program/control", body)
}

/// Path of the server-sent-event feed on any host.
pub const EVENT_STREAM_PATH: &str = "/event-stream";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_control_schedule_carries_time() {
        let req = program_control(ProgramAction::Schedule, Some("2024-05-01T21:00:00.000"));
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/program/control");
        assert_eq!(
            req.body,
            Some(json!({"action": "schedule", "time": "2024-05-01T21:00:00.000"}))
        );
    }

    #[test]
    fn program_control_without_time() {
        let req = program_control(ProgramAction::Continue, None);
        assert_eq!(req.body, Some(json!({"action": "continue"})));
    }

    #[test]
    fn fire_body_uses_lowercase_letter_string() {
        let req = fire('b', 7);
        assert_eq!(req.body, Some(json!({"letter": "b", "number": 7})));
    }

    #[test]
    fn delete_program_is_delete_with_empty_body() {
        let req = delete_program();
        assert_eq!(req.method, Method::DELETE);
        assert_eq!(req.body, Some(json!({})));
    }

    #[test]
    fn gets_have_no_body() {
        assert!(search().body.is_none());
        assert!(list_devices().body.is_none());
    }
}
