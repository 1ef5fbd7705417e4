#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hrportal_core::api::{HttpTransport, OutboundRequest, RawResponse};
use hrportal_core::auth::{Clock, Navigator};
use hrportal_core::{ApiClient, ApiError, Notice, Notifier, SessionRecord, SessionStore};
use reqwest::StatusCode;
use serde_json::Value;

pub const BASE_URL: &str = "https://hr.example.org/api";

/// Transport that replays scripted results and records what was sent.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Result<RawResponse, ApiError>>>,
    pub sent: Mutex<Vec<OutboundRequest>>,
}

impl FakeTransport {
    pub fn reply(&self, status: u16, body: Value) {
        self.replies.lock().unwrap().push_back(Ok(RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body,
        }));
    }

    pub fn fail(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Network(message.to_string().into())));
    }

    pub fn sent(&self) -> Vec<OutboundRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, ApiError> {
        self.sent.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RawResponse { status: StatusCode::OK, body: Value::Null }))
    }
}

/// Shared, ordered log of side effects.
pub type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<Notice>>,
    pub alerts: Mutex<Vec<Notice>>,
    pub journal: Journal,
}

impl RecordingNotifier {
    pub fn with_journal(journal: Journal) -> Self {
        Self { journal, ..Self::default() }
    }

    pub fn shown(&self) -> Vec<Notice> {
        self.shown.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<Notice> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.shown.lock().unwrap().push(notice.clone());
    }

    async fn alert(&self, notice: &Notice) {
        self.alerts.lock().unwrap().push(notice.clone());
        self.journal.lock().unwrap().push("alert".to_string());
    }
}

/// Records redirects and whether a session was still held at that moment.
pub struct RecordingNavigator {
    pub store: SessionStore,
    pub journal: Journal,
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, path: &str) {
        let held = if self.store.get().is_some() { "held" } else { "cleared" };
        self.journal
            .lock()
            .unwrap()
            .push(format!("redirect {} ({})", path, held));
    }
}

/// Wall clock that moves with tokio's (possibly paused) time.
pub struct TokioClock {
    wall: DateTime<Utc>,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self { wall, start: tokio::time::Instant::now() }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now() - self.start;
        self.wall + chrono::Duration::from_std(elapsed).unwrap()
    }
}

pub fn make_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"1001","exp":{}}}"#, exp));
    format!("{}.{}.sig", header, payload)
}

pub fn record(token: &str) -> SessionRecord {
    SessionRecord {
        access_token: token.to_string(),
        hr_role: "hr_admin".to_string(),
        employee_id: "1001".to_string(),
        first_name: "Ana".to_string(),
        last_name: "Cruz".to_string(),
        workstation_hold: None,
    }
}

pub fn client(
    transport: Arc<FakeTransport>,
    store: SessionStore,
    notifier: Arc<RecordingNotifier>,
) -> ApiClient {
    ApiClient::with_transport(transport, BASE_URL, store, notifier)
}

/// Let spawned tasks run to completion on the current-thread runtime.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
