//! Gateway client against the fake backend over real HTTP.

use super::common::backend::{OTP, PASSWORD};
use super::common::{fast_config, FakeBackend};
use kyc_onboard::api::types::{DocumentScanRequest, SubmitRequest};
use kyc_onboard::{ApiClient, CircuitState, ErrorKind};
use serde_json::json;
use std::time::{Duration, Instant};

async fn logged_in(backend: &FakeBackend) -> ApiClient {
    let client = ApiClient::from_config(&fast_config(&backend.base_url())).unwrap();
    client.login("asha", PASSWORD).await.unwrap();
    client
}

fn scan_request() -> DocumentScanRequest {
    DocumentScanRequest {
        document_type: "PAN".into(),
        image_data: "data:image/png;base64,iVBORw0KGgo=".into(),
    }
}

#[tokio::test]
async fn test_login_token_is_attached() {
    let backend = FakeBackend::start().await;
    let client = ApiClient::from_config(&fast_config(&backend.base_url())).unwrap();

    // Protected endpoints refuse without a token, and 401 is never retried
    let err = client.fetch_dashboard().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthError);
    assert_eq!(backend.hits("/kyc/dashboard"), 1);

    let response = client.login("asha", PASSWORD).await.unwrap();
    assert_eq!(response.user["username"], "asha");
    assert!(client.is_authenticated());

    let dashboard = client.fetch_dashboard().await.unwrap();
    assert_eq!(dashboard.total_kyc_attempts, 12);
    assert_eq!(dashboard.failure_by_step.get("PAN Upload"), Some(&2));
    assert_eq!(dashboard.daily_success_rates[0].label, "2026-10-17");
    assert_eq!(dashboard.recent_attempts[0].full_name, "Asha Rao");
    assert!(dashboard.weekly_success_rates.is_empty());
}

#[tokio::test]
async fn test_wrong_password_is_auth_error() {
    let backend = FakeBackend::start().await;
    let client = ApiClient::from_config(&fast_config(&backend.base_url())).unwrap();
    let err = client.login("asha", "nope").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthError);
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_server_errors_are_retried_with_one_idempotency_key() {
    let backend = FakeBackend::start().await;
    let client = logged_in(&backend).await;
    backend.fail("/kyc/document-scan", 503, 2);

    let scan = client.scan_document(&scan_request()).await.unwrap();
    assert_eq!(scan.quality_score, 88.0);
    assert_eq!(scan.document_type.as_deref(), Some("PAN"));

    let keys = backend.idempotency_keys("/kyc/document-scan");
    assert_eq!(keys.len(), 3);
    assert!(keys[0].is_some());
    assert!(keys.iter().all(|k| k == &keys[0]));

    // A second logical call gets a new key
    client.scan_document(&scan_request()).await.unwrap();
    let keys = backend.idempotency_keys("/kyc/document-scan");
    assert_ne!(keys[3], keys[0]);
}

#[tokio::test]
async fn test_submit_carries_no_idempotency_key() {
    let backend = FakeBackend::start().await;
    let client = logged_in(&backend).await;
    let request = SubmitRequest {
        personal_info: json!({ "fullName": "Asha Rao" }),
        document_data: json!({}),
        aadhaar_data: json!({}),
        facial_data: json!({}),
        duplicate_check: None,
        consent: true,
    };

    let response = client.submit_kyc(&request).await.unwrap();
    assert_eq!(response.user_id.as_deref(), Some("KYC-2026-0001"));
    assert_eq!(response.estimated_completion.as_deref(), Some("24 hours"));
    assert_eq!(backend.idempotency_keys("/kyc/submit"), vec![None]);
}

#[tokio::test]
async fn test_envelope_rejection_is_classified_and_not_retried() {
    let backend = FakeBackend::start().await;
    let client = logged_in(&backend).await;

    let err = client.verify_otp("123456789012", "000000").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AadhaarOtpError);
    assert_eq!(backend.hits("/kyc/aadhaar/verify-otp"), 1);

    client.verify_otp("123456789012", OTP).await.unwrap();
}

#[tokio::test]
async fn test_rate_limit_and_request_errors() {
    let backend = FakeBackend::start().await;
    let client = logged_in(&backend).await;

    backend.fail("/kyc/dashboard", 429, 3);
    let err = client.fetch_dashboard().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimitError);
    assert_eq!(backend.hits("/kyc/dashboard"), 3);

    let err = client.send_otp("12345").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RequestError);
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // Nothing listens on the discard port
    let config = fast_config("http://127.0.0.1:9/api");
    let client = ApiClient::from_config(&config).unwrap();

    let started = Instant::now();
    let err = client.login("asha", PASSWORD).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NetworkError);
    // Two retries at 5ms and 10ms
    assert!(started.elapsed() >= Duration::from_millis(15));
}

#[tokio::test]
async fn test_breaker_opens_then_recovers_after_cooldown() {
    let backend = FakeBackend::start().await;
    let client = logged_in(&backend).await;

    // Five exhausted calls of three attempts each
    backend.fail("/kyc/progress", 500, 15);
    for _ in 0..5 {
        let err = client.fetch_progress().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServerError);
    }
    assert_eq!(backend.hits("/kyc/progress"), 15);
    assert_eq!(client.breaker_snapshot().state, CircuitState::Open);

    let err = client.fetch_progress().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::BreakerOpen);
    assert_eq!(backend.hits("/kyc/progress"), 15);

    // Calls outside the guarded set are unaffected
    client.fetch_dashboard().await.unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    let progress = client.fetch_progress().await.unwrap();
    assert!(progress.is_empty());
    assert_eq!(client.breaker_snapshot().state, CircuitState::Closed);
    assert_eq!(client.breaker_snapshot().consecutive_failures, 0);
}
