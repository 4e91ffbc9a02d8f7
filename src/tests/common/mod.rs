// tests/common/mod.rs
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use http::{HeaderMap, StatusCode};
use httpmock::MockServer;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::cache::token_bundle::TokenBundle;
use crate::config::types::KeycloakConfig;
use crate::helpers::time::now_i64;
use crate::keycloak::client::KeycloakClient;

pub const REALM: &str = "onto";
pub const CLIENT_ID: &str = "frontend-prod";
pub const TOKEN_PATH: &str = "/realms/onto/protocol/openid-connect/token";
pub const USERINFO_PATH: &str = "/realms/onto/protocol/openid-connect/userinfo";
pub const REVOKE_PATH: &str = "/realms/onto/protocol/openid-connect/revoke";
pub const SESSION_STATE_API_KEY: &str = "test-api-key";

pub fn keycloak_config(base_url: &str, client_secret: Option<&str>) -> KeycloakConfig {
    KeycloakConfig::new(base_url, REALM, CLIENT_ID, client_secret)
}

pub fn keycloak_client(server: &MockServer) -> KeycloakClient {
    KeycloakClient::new(keycloak_config(&server.base_url(), None)).expect("keycloak client")
}

pub fn token_body(access_token: &str, refresh_token: Option<&str>) -> Value {
    let mut body = json!({
        "access_token": access_token,
        "expires_in": 3600,
        "token_type": "Bearer",
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = json!(refresh_token);
        body["refresh_expires_in"] = json!(86400);
    }
    body
}

/// Bundle with expiries relative to the current time (negative = already past).
pub fn bundle_expiring_in(
    access_token: &str,
    access_in: i64,
    refresh: Option<(&str, i64)>,
) -> TokenBundle {
    let now = now_i64();
    TokenBundle {
        access_token: Some(access_token.to_owned()),
        access_expires_at: Some(now + access_in),
        refresh_token: refresh.map(|(token, _)| token.to_owned()),
        refresh_expires_at: refresh.map(|(_, refresh_in)| now + refresh_in),
        last_updated: Some(now),
        ..TokenBundle::default()
    }
}

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// In-memory stand-in for the session-state service.
#[derive(Default)]
pub struct FakeSessionState {
    pub payloads: Mutex<HashMap<String, Value>>,
    pub gets: AtomicUsize,
    pub posts: AtomicUsize,
    pub fail_posts: AtomicBool,
}

impl FakeSessionState {
    pub fn payload(&self, context_id: &str) -> Option<Value> {
        self.payloads.lock().unwrap().get(context_id).cloned()
    }

    pub fn seed(&self, context_id: &str, payload: Value) {
        self.payloads.lock().unwrap().insert(context_id.to_owned(), payload);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn posts(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == SESSION_STATE_API_KEY)
}

async fn get_state(
    State(fake): State<Arc<FakeSessionState>>,
    Path(context_id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid api key"})));
    }
    fake.gets.fetch_add(1, Ordering::SeqCst);
    match fake.payload(&context_id) {
        Some(payload) => (
            StatusCode::OK,
            Json(json!({"contextId": context_id, "createdAt": "2025-01-01T00:00:00Z", "payload": payload})),
        ),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))),
    }
}

async fn post_state(
    State(fake): State<Arc<FakeSessionState>>,
    Path(context_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid api key"})));
    }
    fake.posts.fetch_add(1, Ordering::SeqCst);
    if fake.fail_posts.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "storage down"})));
    }
    let payload = body.get("payload").cloned().unwrap_or_else(|| json!({}));
    fake.seed(&context_id, payload.clone());
    (
        StatusCode::OK,
        Json(json!({"contextId": context_id, "createdAt": "2025-01-01T00:00:00Z", "payload": payload})),
    )
}

/// Start the fake service; returns its state, base URL and server task.
pub async fn spawn_session_state() -> (Arc<FakeSessionState>, String, JoinHandle<()>) {
    let fake = Arc::new(FakeSessionState::default());
    let router = Router::new()
        .route("/session-state/{context_id}", get(get_state).post(post_state))
        .with_state(fake.clone());
    let (handle, addr) = spawn_axum(router).await;
    (fake, format!("http://{}", addr), handle)
}
