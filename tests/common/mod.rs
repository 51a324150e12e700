// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! Shared test harness: a mock identity service + business API server.
//!
//! The mock is a real axum server on an ephemeral port so the clients are
//! exercised over actual HTTP, including concurrent 401 storms.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use jendo_portal::config::Config;
use jendo_portal::models::auth::TokenPair;
use jendo_portal::store::TokenStore;
use jendo_portal::Portal;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Knobs and counters shared with the mock handlers.
pub struct MockState {
    /// Access token the business API currently accepts.
    pub valid_access: Mutex<String>,
    /// Refresh token the identity service currently accepts.
    pub valid_refresh: Mutex<String>,
    /// Rotation counter; refresh N issues `access-N`/`refresh-N`.
    pub generation: AtomicUsize,

    pub login_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,

    /// Reject every refresh with 401.
    pub fail_refresh: AtomicBool,
    /// Profile returns 401 no matter which token is presented.
    pub always_unauthorized: AtomicBool,
    /// Profile returns 500.
    pub fail_profile: AtomicBool,
    /// Artificial delay inside the refresh handler, to widen race windows.
    pub refresh_delay_ms: AtomicUsize,

    /// Profile body served by `/users/profile` and embedded in auth
    /// responses.
    pub profile: Mutex<Value>,
}

#[allow(dead_code)]
pub fn default_profile() -> Value {
    json!({
        "id": 1,
        "email": "a@b.com",
        "firstName": "Asha",
        "lastName": "Bandara",
        "role": {"name": "USER", "permissions": []}
    })
}

impl MockState {
    fn new() -> Self {
        Self {
            valid_access: Mutex::new("access-0".to_string()),
            valid_refresh: Mutex::new("refresh-0".to_string()),
            generation: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            fail_refresh: AtomicBool::new(false),
            always_unauthorized: AtomicBool::new(false),
            fail_profile: AtomicBool::new(false),
            refresh_delay_ms: AtomicUsize::new(0),
            profile: Mutex::new(default_profile()),
        }
    }

    #[allow(dead_code)]
    pub fn set_valid_access(&self, token: &str) {
        *self.valid_access.lock().unwrap() = token.to_string();
    }

    #[allow(dead_code)]
    pub fn set_profile_role(&self, role: &str) {
        self.profile.lock().unwrap()["role"]["name"] = json!(role);
    }

    #[allow(dead_code)]
    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn profile_count(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    fn auth_payload(&self) -> Value {
        let mut payload = json!({
            "accessToken": *self.valid_access.lock().unwrap(),
            "refreshToken": *self.valid_refresh.lock().unwrap(),
            "tokenType": "Bearer",
            "expiresIn": 900
        });
        payload["user"] = self.profile.lock().unwrap().clone();
        payload
    }

    fn check_bearer(&self, headers: &HeaderMap) -> Result<(), Response> {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));
        let valid = self.valid_access.lock().unwrap().clone();
        match presented {
            Some(token) if token == valid => Ok(()),
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Token expired"})),
            )
                .into_response()),
        }
    }
}

pub struct MockBackend {
    /// `http://127.0.0.1:<port>`, used for both base URLs.
    pub addr: String,
    pub state: Arc<MockState>,
}

/// Start the mock server and hand back its address and knobs.
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState::new());

    let app = Router::new()
        // Identity service
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/mobile/google", post(google_login))
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/register/confirm", post(confirm_signup))
        .route("/refresh", post(refresh))
        // Business API
        .route("/users/profile", get(profile))
        .route("/doctors", get(doctors))
        .route("/appointments", post(book_appointment).get(appointments))
        .route("/appointments/{id}", delete(cancel_appointment))
        .route("/tests/results", get(test_results))
        .route("/tests/results/{id}/report", get(test_report))
        .route("/medical-records", get(medical_records))
        .route("/medical-records/{id}/file", get(record_file))
        .route("/wellness/articles", get(wellness_articles))
        .route("/assistant/chat", post(assistant_chat))
        .route("/admin/export", get(admin_export))
        .route("/broken", get(broken))
        .route("/broken-bare", get(broken_bare))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend serve");
    });

    MockBackend {
        addr: format!("http://{}", addr),
        state,
    }
}

#[allow(dead_code)]
pub fn test_config(backend: &MockBackend) -> Config {
    Config {
        auth_base_url: backend.addr.clone(),
        api_base_url: backend.addr.clone(),
        public_paths: vec!["/wellness".to_string()],
        request_timeout_secs: 5,
        storage_path: std::env::temp_dir().join("jendo-portal-unused.json"),
        google_client_id: "google-client".to_string(),
    }
}

/// Portal wired against the mock backend with an in-memory store.
#[allow(dead_code)]
pub fn test_portal(backend: &MockBackend) -> Portal {
    Portal::with_store(test_config(backend), TokenStore::in_memory()).expect("wire test portal")
}

/// Seed the store with a token pair, as a previous session would have.
#[allow(dead_code)]
pub fn seed_tokens(portal: &Portal, access: &str, refresh: &str) {
    portal.store.set_token_pair(&TokenPair {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        token_type: "Bearer".to_string(),
        expires_in: 900,
    });
}

/// Poll `condition` until it holds or the timeout elapses.
#[allow(dead_code)]
pub async fn wait_for(condition: impl Fn() -> bool, timeout_ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ─── Identity service handlers ───────────────────────────────────────────

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    if body["email"] == json!("a@b.com") && body["password"] == json!("secret") {
        // Login responses arrive wrapped in the `{success, message, data}`
        // envelope.
        Json(json!({
            "success": true,
            "message": "Login successful",
            "data": state.auth_payload()
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid credentials"})),
        )
            .into_response()
    }
}

async fn register(State(state): State<Arc<MockState>>, Json(_body): Json<Value>) -> Response {
    state.register_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "success": true,
        "message": "Registered",
        "data": state.auth_payload()
    }))
    .into_response()
}

async fn google_login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    if body["idToken"] == json!("google-id-token") && body["clientId"] == json!("google-client") {
        Json(json!({"success": true, "data": state.auth_payload()})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid Google token"})),
        )
            .into_response()
    }
}

async fn send_otp(Json(body): Json<Value>) -> Response {
    if body.get("email").and_then(Value::as_str).is_some() {
        Json(json!({"success": true, "message": "OTP sent"})).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "email required"})),
        )
            .into_response()
    }
}

async fn verify_otp(Json(body): Json<Value>) -> Response {
    let verified = body["otp"] == json!("123456");
    Json(json!({"success": true, "verified": verified})).into_response()
}

async fn confirm_signup(Json(_body): Json<Value>) -> Response {
    Json(json!({"success": true, "message": "Account confirmed"})).into_response()
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }

    if state.fail_refresh.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Refresh token expired"})),
        )
            .into_response();
    }

    let presented = body["refreshToken"].as_str().unwrap_or_default();
    if presented != *state.valid_refresh.lock().unwrap() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid refresh token"})),
        )
            .into_response();
    }

    let generation = state.generation.fetch_add(1, Ordering::SeqCst) + 1;
    *state.valid_access.lock().unwrap() = format!("access-{}", generation);
    *state.valid_refresh.lock().unwrap() = format!("refresh-{}", generation);

    // Refresh responses come back bare (no envelope), which exercises the
    // other decode path.
    Json(state.auth_payload()).into_response()
}

// ─── Business API handlers ───────────────────────────────────────────────

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.profile_calls.fetch_add(1, Ordering::SeqCst);

    if state.always_unauthorized.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Token expired"})),
        )
            .into_response();
    }
    if state.fail_profile.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "profile backend down"})),
        )
            .into_response();
    }
    if let Err(denied) = state.check_bearer(&headers) {
        return denied;
    }

    Json(json!({
        "success": true,
        "message": "ok",
        "data": *state.profile.lock().unwrap()
    }))
    .into_response()
}

async fn doctors(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(denied) = state.check_bearer(&headers) {
        return denied;
    }
    Json(json!([
        {"id": 11, "firstName": "Nuwan", "lastName": "Perera", "specialty": "Cardiology", "hospital": "Jendo Clinic"},
        {"id": 12, "firstName": "Dilini", "lastName": "Fernando", "specialty": "Vascular Surgery"}
    ]))
    .into_response()
}

async fn book_appointment(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = state.check_bearer(&headers) {
        return denied;
    }
    Json(json!({
        "id": 42,
        "doctorId": body["doctorId"],
        "scheduledAt": body["scheduledAt"],
        "status": "CONFIRMED",
        "reason": body["reason"]
    }))
    .into_response()
}

async fn appointments(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(denied) = state.check_bearer(&headers) {
        return denied;
    }
    Json(json!([{
        "id": 42,
        "doctorId": 11,
        "scheduledAt": "2026-08-20T09:00:00Z",
        "status": "CONFIRMED",
        "reason": null
    }]))
    .into_response()
}

async fn cancel_appointment(
    State(state): State<Arc<MockState>>,
    Path(_id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = state.check_bearer(&headers) {
        return denied;
    }
    Json(json!({"success": true})).into_response()
}

async fn test_results(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(denied) = state.check_bearer(&headers) {
        return denied;
    }
    Json(json!([{
        "id": 7,
        "testType": "JENDO_VASCULAR",
        "takenAt": "2026-07-01T08:30:00Z",
        "summary": "Endothelial response within normal range",
        "riskLevel": "LOW"
    }]))
    .into_response()
}

#[allow(dead_code)]
pub const REPORT_BYTES: &[u8] = b"%PDF-1.4 jendo vascular report";

async fn test_report(
    State(state): State<Arc<MockState>>,
    Path(_id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = state.check_bearer(&headers) {
        return denied;
    }
    (
        [(header::CONTENT_TYPE, "application/pdf")],
        Bytes::from_static(REPORT_BYTES),
    )
        .into_response()
}

async fn medical_records(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(denied) = state.check_bearer(&headers) {
        return denied;
    }
    Json(json!([{
        "id": 3,
        "title": "Lipid panel",
        "category": "LAB",
        "uploadedAt": "2026-06-12T10:00:00Z",
        "fileName": "lipid-panel.pdf"
    }]))
    .into_response()
}

async fn record_file(
    State(state): State<Arc<MockState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = state.check_bearer(&headers) {
        return denied;
    }
    Bytes::from(format!("record-{}-contents", id)).into_response()
}

async fn wellness_articles(headers: HeaderMap) -> Response {
    // Public path: the client must NOT attach credentials here.
    if headers.contains_key(header::AUTHORIZATION) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "unexpected auth header on public path"})),
        )
            .into_response();
    }
    Json(json!([{
        "id": 1,
        "title": "Five habits for a healthy heart",
        "summary": "Small daily choices that protect your vessels",
        "url": "https://jendo.test/wellness/1",
        "publishedAt": "2026-05-01T00:00:00Z"
    }]))
    .into_response()
}

async fn assistant_chat(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = state.check_bearer(&headers) {
        return denied;
    }
    let message = body["message"].as_str().unwrap_or_default();
    Json(json!({
        "reply": format!("You asked: {}", message),
        "sources": ["wellness/1"]
    }))
    .into_response()
}

async fn admin_export(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(denied) = state.check_bearer(&headers) {
        return denied;
    }
    (
        StatusCode::FORBIDDEN,
        Json(json!({"message": "admin only"})),
    )
        .into_response()
}

async fn broken() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"message": "storage offline"})),
    )
        .into_response()
}

async fn broken_bare() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "everything is on fire").into_response()
}
