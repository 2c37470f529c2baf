//! In-process mock of the dispatcher and origin servers

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fetchrelay::config::Config;

pub const TOKEN: &str = "secret-token";
pub const CLIENT_NAME: &str = "test-worker";

/// Canned behaviour for one test
#[derive(Debug, Clone)]
pub struct Script {
    pub poll: Value,
    pub poll_status: u16,
    pub work_status: u16,
    pub work_content_type: String,
    pub work_body: Vec<u8>,
    pub work_delay: Duration,
    pub fail_status: u16,
    pub submit_status: u16,
    pub submit_reply: String,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            poll: json!({"status": "queue empty"}),
            poll_status: 200,
            work_status: 200,
            work_content_type: "application/pdf".to_string(),
            work_body: b"%PDF-1.7 test".to_vec(),
            work_delay: Duration::ZERO,
            fail_status: 200,
            submit_status: 200,
            submit_reply: json!({"ok": true, "unfetched_objects": []}).to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmittedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub fields: HashMap<String, String>,
    pub files: Vec<SubmittedFile>,
}

impl Submission {
    pub fn file(&self, field: &str) -> Option<&SubmittedFile> {
        self.files.iter().find(|file| file.field == field)
    }
}

#[derive(Debug, Clone)]
pub struct OriginHit {
    pub path: String,
    pub if_none_match: Option<String>,
    pub user_agent: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub polls: Vec<Value>,
    pub poll_tokens: Vec<Option<String>>,
    pub failures: Vec<Value>,
    pub submissions: Vec<Submission>,
    pub origin: Vec<OriginHit>,
}

#[derive(Clone)]
pub struct Mock {
    pub base_url: String,
    script: Arc<Mutex<Script>>,
    recorded: Arc<Mutex<Recorded>>,
}

impl Mock {
    pub async fn start(script: Script) -> Self {
        let script = Arc::new(Mutex::new(script));
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let state = MockState {
            script: Arc::clone(&script),
            recorded: Arc::clone(&recorded),
        };

        let app = Router::new()
            .route("/request_job", post(request_job))
            .route("/job_fail", post(job_fail))
            .route("/submit_job", post(submit_job))
            .route("/downloads/{work_id}/{file}", get(download))
            .route("/img/{name}", get(image))
            .route("/unfetched/{name}", get(image))
            .with_state(state);

        // Bind to random available port
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let bound_addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", bound_addr),
            script,
            recorded,
        }
    }

    pub fn update(&self, change: impl FnOnce(&mut Script)) {
        change(&mut self.script.lock().unwrap());
    }

    pub fn recorded<T>(&self, read: impl FnOnce(&Recorded) -> T) -> T {
        read(&self.recorded.lock().unwrap())
    }

    /// Configuration pointing both dispatcher and origin at this mock
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.dispatcher.base_url = Some(self.base_url.clone());
        config.dispatcher.token = Some(TOKEN.to_string());
        config.worker.client_name = Some(CLIENT_NAME.to_string());
        config.origin.download_base = self.base_url.clone();
        config.validate().unwrap();
        config
    }
}

pub fn job(work_format: &str, cache_infos: Value) -> Value {
    json!({
        "status": "ok",
        "work_id": 4242,
        "updated": "1714557600",
        "work_format": work_format,
        "dispatch_id": 901,
        "report_code": "rc-77",
        "cache_infos": cache_infos,
    })
}

#[derive(Clone)]
struct MockState {
    script: Arc<Mutex<Script>>,
    recorded: Arc<Mutex<Recorded>>,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}

async fn request_job(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    {
        let mut recorded = state.recorded.lock().unwrap();
        recorded.polls.push(body);
        recorded.poll_tokens.push(header_value(&headers, "token"));
    }
    let script = state.script.lock().unwrap().clone();
    (status(script.poll_status), Json(script.poll)).into_response()
}

async fn job_fail(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.recorded.lock().unwrap().failures.push(body);
    let code = state.script.lock().unwrap().fail_status;
    (status(code), Json(json!({}))).into_response()
}

async fn submit_job(State(state): State<MockState>, mut multipart: Multipart) -> Response {
    let mut submission = Submission::default();

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap();

        if file_name.is_some() {
            submission.files.push(SubmittedFile {
                field: name,
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            submission
                .fields
                .insert(name, String::from_utf8_lossy(&bytes).to_string());
        }
    }

    state.recorded.lock().unwrap().submissions.push(submission);

    let script = state.script.lock().unwrap().clone();
    (
        status(script.submit_status),
        [(header::CONTENT_TYPE, "application/json")],
        script.submit_reply,
    )
        .into_response()
}

fn record_origin(state: &MockState, path: String, headers: &HeaderMap) {
    state.recorded.lock().unwrap().origin.push(OriginHit {
        path,
        if_none_match: header_value(headers, "if-none-match"),
        user_agent: header_value(headers, "user-agent"),
        token: header_value(headers, "token"),
    });
}

async fn download(
    State(state): State<MockState>,
    Path((work_id, file)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    record_origin(&state, format!("/downloads/{}/{}", work_id, file), &headers);

    let script = state.script.lock().unwrap().clone();
    if !script.work_delay.is_zero() {
        tokio::time::sleep(script.work_delay).await;
    }

    (
        status(script.work_status),
        [(header::CONTENT_TYPE, script.work_content_type)],
        Bytes::from(script.work_body),
    )
        .into_response()
}

/// `fresh-*` always 200, `cached-*` 304 when validated, `stale-*` always 304,
/// anything else 404
async fn image(
    State(state): State<MockState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    record_origin(&state, name.clone(), &headers);

    let validated = headers.contains_key(header::IF_NONE_MATCH);
    if name.starts_with("stale-") || (name.starts_with("cached-") && validated) {
        return StatusCode::NOT_MODIFIED.into_response();
    }

    if name.starts_with("fresh-") || name.starts_with("cached-") {
        return (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "image/png".to_string()),
                (header::ETAG, format!("\"v2-{}\"", name)),
            ],
            Bytes::from(format!("bytes of {}", name)),
        )
            .into_response();
    }

    StatusCode::NOT_FOUND.into_response()
}
