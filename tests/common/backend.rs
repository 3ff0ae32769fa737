//! In-process fake of the KYC backend.
//!
//! Serves the real HTTP contract on an ephemeral port so tests exercise the
//! reqwest transport end to end. Failures are injected per path.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const TOKEN: &str = "test-token";
pub const PASSWORD: &str = "secret";
pub const OTP: &str = "123456";

#[derive(Debug)]
pub struct BackendState {
    /// Last `progressData` saved
    pub progress: Option<Value>,
    pub quality_score: f64,
    pub face_confidence: f64,
    pub duplicate: bool,
    pub dashboard: Value,
    /// Statuses returned (once each) before a path behaves normally
    pub failures: HashMap<String, VecDeque<u16>>,
    /// Every request as `(path, idempotency key)`
    pub requests: Vec<(String, Option<String>)>,
    pub submissions: Vec<Value>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            progress: None,
            quality_score: 88.0,
            face_confidence: 93.5,
            duplicate: false,
            dashboard: json!({
                "totalKycAttempts": 12,
                "successfulKyc": 9,
                "failedKyc": 3,
                "successRate": 75.0,
                "failureByStep": { "PAN Upload": 2, "Face Match": 1 },
                "uploadFailures": 2,
                "otpFailures": 0,
                "faceMismatch": 1,
                "dailySuccessRates": [{ "date": "2026-10-17", "rate": 80.0 }],
                "recentAttempts": [{
                    "id": 7,
                    "fullName": "Asha Rao",
                    "status": "approved",
                    "documentNumber": "ABCDE1234F",
                    "createdAt": "2026-10-17T10:00:00Z"
                }]
            }),
            failures: HashMap::new(),
            requests: Vec::new(),
            submissions: Vec::new(),
        }
    }
}

pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<BackendState>>,
    server: tokio::task::JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(BackendState::default()));
        let protected = Router::new()
            .route("/api/kyc/save-progress", post(save_progress))
            .route("/api/kyc/progress", get(fetch_progress))
            .route("/api/kyc/document-scan", post(document_scan))
            .route("/api/kyc/facial-recognition", post(facial_recognition))
            .route("/api/kyc/duplicate-check", post(duplicate_check))
            .route("/api/kyc/aadhaar/send-otp", post(send_otp))
            .route("/api/kyc/aadhaar/verify-otp", post(verify_otp))
            .route("/api/kyc/submit", post(submit))
            .route("/api/kyc/dashboard", get(dashboard))
            .route_layer(middleware::from_fn(require_token));

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .merge(protected)
            .layer(middleware::from_fn_with_state(state.clone(), record_and_inject))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend");
        });

        Self {
            addr,
            state,
            server,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Fail the next `times` requests to `path` (relative to `/api`).
    pub fn fail(&self, path: &str, status: u16, times: usize) {
        let mut state = self.state.lock();
        let queue = state.failures.entry(format!("/api{path}")).or_default();
        queue.extend(std::iter::repeat(status).take(times));
    }

    pub fn hits(&self, path: &str) -> usize {
        let full = format!("/api{path}");
        self.state
            .lock()
            .requests
            .iter()
            .filter(|(p, _)| *p == full)
            .count()
    }

    pub fn idempotency_keys(&self, path: &str) -> Vec<Option<String>> {
        let full = format!("/api{path}");
        self.state
            .lock()
            .requests
            .iter()
            .filter(|(p, _)| *p == full)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn stored_progress(&self) -> Option<Value> {
        self.state.lock().progress.clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

type Shared = State<Arc<Mutex<BackendState>>>;

fn envelope(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn refuse(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

async fn record_and_inject(State(state): Shared, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let key = request
        .headers()
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let injected = {
        let mut state = state.lock();
        state.requests.push((path.clone(), key));
        state.failures.get_mut(&path).and_then(VecDeque::pop_front)
    };
    if let Some(status) = injected {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return refuse(status, "Injected failure");
    }
    next.run(request).await
}

async fn require_token(headers: HeaderMap, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {TOKEN}");
    let authorized = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return refuse(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    next.run(request).await
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return refuse(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    envelope(json!({ "token": TOKEN, "user": { "username": body["username"] } }))
}

async fn save_progress(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.lock().progress = Some(body["progressData"].clone());
    envelope(json!({}))
}

async fn fetch_progress(State(state): Shared) -> Response {
    let progress = state.lock().progress.clone().unwrap_or(Value::Null);
    envelope(progress)
}

async fn document_scan(State(state): Shared, Json(body): Json<Value>) -> Response {
    let image = body["imageData"].as_str().unwrap_or_default();
    if !image.starts_with("data:image/") {
        return refuse(StatusCode::BAD_REQUEST, "Document image missing");
    }
    let score = state.lock().quality_score;
    envelope(json!({
        "type": body["documentType"],
        "fullName": "ASHA RAO",
        "documentNumber": "ABCDE1234F",
        "dateOfBirth": "15/01/1990",
        "expiryDate": null,
        "nationality": "Indian",
        "qualityScore": score,
    }))
}

async fn facial_recognition(State(state): Shared) -> Response {
    let confidence = state.lock().face_confidence;
    envelope(json!({ "confidence": confidence, "verified": confidence >= 70.0 }))
}

async fn duplicate_check(State(state): Shared) -> Response {
    if state.lock().duplicate {
        return envelope(json!({
            "isDuplicate": true,
            "duplicateInfo": { "matchedOn": "documentNumber" },
            "message": "An application with these details already exists"
        }));
    }
    envelope(json!({ "isDuplicate": false }))
}

async fn send_otp(Json(body): Json<Value>) -> Response {
    if body["aadhaarNumber"].as_str().map(str::len) != Some(12) {
        return refuse(StatusCode::BAD_REQUEST, "Invalid Aadhaar number");
    }
    envelope(json!({ "sent": true }))
}

async fn verify_otp(Json(body): Json<Value>) -> Response {
    if body["otp"] != OTP {
        // The real service rejects inside a 200 envelope
        return Json(json!({ "success": false, "message": "Invalid OTP" })).into_response();
    }
    envelope(json!({ "verified": true }))
}

async fn submit(State(state): Shared, Json(body): Json<Value>) -> Response {
    if body["consent"] != true {
        return refuse(StatusCode::BAD_REQUEST, "Consent required");
    }
    state.lock().submissions.push(body);
    envelope(json!({
        "referenceNumber": "KYC-2026-0001",
        "status": "pending_review",
        "estimatedProcessingTime": "24 hours"
    }))
}

async fn dashboard(State(state): Shared) -> Response {
    let data = state.lock().dashboard.clone();
    envelope(data)
}
