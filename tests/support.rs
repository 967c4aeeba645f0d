//! Mock provider endpoints shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use inbox_auth::oauth::ClientRegistration;
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// An axum app served on an ephemeral localhost port until dropped.
pub struct MockServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockServer {
    pub async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock addr");
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
                .expect("mock server");
        });
        Self {
            addr,
            shutdown: Some(tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Default)]
pub struct TokenEndpointState {
    pub exchanges: AtomicUsize,
    pub refreshes: AtomicUsize,
    pub forms: Mutex<Vec<HashMap<String, String>>>,
}

fn invalid_grant() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "invalid_grant", "error_description": "Bad Request"})),
    )
        .into_response()
}

async fn token_handler(
    State(state): State<Arc<TokenEndpointState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.forms.lock().expect("forms").push(form.clone());
    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => {
            state.exchanges.fetch_add(1, Ordering::SeqCst);
            match form.get("code").map(String::as_str) {
                Some("abc123") => Json(json!({
                    "access_token": "T1",
                    "refresh_token": "R1",
                    "token_type": "Bearer",
                    "expires_in": 3600
                }))
                .into_response(),
                Some("def456") => Json(json!({
                    "access_token": "T2",
                    "refresh_token": "R2",
                    "expires_in": 3600
                }))
                .into_response(),
                _ => invalid_grant(),
            }
        }
        Some("refresh_token") => {
            let n = state.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            match form.get("refresh_token").map(String::as_str) {
                Some("R1") => Json(json!({
                    "access_token": format!("T1-refreshed-{n}"),
                    "expires_in": 3600
                }))
                .into_response(),
                _ => invalid_grant(),
            }
        }
        _ => invalid_grant(),
    }
}

/// Issues T1/R1 for code `abc123`, T2/R2 for `def456`, refreshes `R1`;
/// everything else is `invalid_grant`.
pub struct TokenEndpointMock {
    pub server: MockServer,
    pub state: Arc<TokenEndpointState>,
}

impl TokenEndpointMock {
    pub async fn spawn() -> Self {
        let state = Arc::new(TokenEndpointState::default());
        let app = Router::new()
            .route("/token", post(token_handler))
            .with_state(state.clone());
        Self {
            server: MockServer::spawn(app).await,
            state,
        }
    }

    pub fn token_url(&self) -> String {
        self.server.url("/token")
    }

    pub fn refreshes(&self) -> usize {
        self.state.refreshes.load(Ordering::SeqCst)
    }

    pub fn exchanges(&self) -> usize {
        self.state.exchanges.load(Ordering::SeqCst)
    }

    pub fn last_form(&self) -> Option<HashMap<String, String>> {
        self.state.forms.lock().expect("forms").last().cloned()
    }
}

pub fn registration(token_url: &str) -> ClientRegistration {
    ClientRegistration {
        client_id: "test-client".to_string(),
        client_secret: Some("test-secret".to_string()),
        auth_url: "https://accounts.example.com/o/oauth2/auth".to_string(),
        token_url: token_url.to_string(),
        redirect_uris: vec![],
    }
}

#[derive(Default)]
pub struct MailboxState {
    pub auth_headers: Mutex<Vec<String>>,
    pub watch_bodies: Mutex<Vec<Value>>,
    pub stops: AtomicUsize,
}

impl MailboxState {
    fn record(&self, headers: &HeaderMap) -> bool {
        let value = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let ok = value.starts_with("Bearer ");
        self.auth_headers.lock().expect("headers").push(value);
        ok
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"code": 401, "message": "missing token", "status": "UNAUTHENTICATED"}})),
    )
        .into_response()
}

async fn list_messages(
    State(state): State<Arc<MailboxState>>,
    Path(user): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !state.record(&headers) {
        return unauthorized();
    }
    if user != "me" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({
        "messages": [
            {"id": "m1", "threadId": "t1"},
            {"id": "m2", "threadId": "t2"},
            {"id": "m3", "threadId": "t3"}
        ],
        "resultSizeEstimate": 3
    }))
    .into_response()
}

async fn get_message(
    State(state): State<Arc<MailboxState>>,
    Path((_user, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !state.record(&headers) {
        return unauthorized();
    }
    match id.as_str() {
        "m1" => Json(json!({
            "id": "m1",
            "payload": {"headers": [
                {"name": "From", "value": "alice@example.com"},
                {"name": "Subject", "value": "Quarterly report"}
            ]}
        }))
        .into_response(),
        "m3" => Json(json!({"id": "m3", "payload": {"headers": []}})).into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"code": 500, "message": "backend error"}})),
        )
            .into_response(),
    }
}

async fn list_labels(State(state): State<Arc<MailboxState>>, headers: HeaderMap) -> Response {
    if !state.record(&headers) {
        return unauthorized();
    }
    Json(json!({"labels": [
        {"id": "INBOX", "name": "INBOX", "type": "system"},
        {"id": "Label_1", "name": "Receipts", "type": "user"}
    ]}))
    .into_response()
}

async fn watch(
    State(state): State<Arc<MailboxState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.record(&headers) {
        return unauthorized();
    }
    state.watch_bodies.lock().expect("watch").push(body);
    Json(json!({"historyId": "987654", "expiration": "1767225600000"})).into_response()
}

async fn stop(State(state): State<Arc<MailboxState>>, headers: HeaderMap) -> Response {
    if !state.record(&headers) {
        return unauthorized();
    }
    state.stops.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT.into_response()
}

/// Messages m1 (subject), m2 (fails to load), m3 (no subject); two labels.
pub struct MailboxMock {
    pub server: MockServer,
    pub state: Arc<MailboxState>,
}

impl MailboxMock {
    pub async fn spawn() -> Self {
        let state = Arc::new(MailboxState::default());
        let app = Router::new()
            .route("/users/:user/messages", get(list_messages))
            .route("/users/:user/messages/:id", get(get_message))
            .route("/users/:user/labels", get(list_labels))
            .route("/users/:user/watch", post(watch))
            .route("/users/:user/stop", post(stop))
            .with_state(state.clone());
        Self {
            server: MockServer::spawn(app).await,
            state,
        }
    }

    pub fn base_url(&self) -> String {
        self.server.url("")
    }

    pub fn auth_headers(&self) -> Vec<String> {
        self.state.auth_headers.lock().expect("headers").clone()
    }
}
