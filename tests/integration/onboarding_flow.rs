//! Full onboarding flows through the orchestrator and the fake backend.

use super::common::backend::{OTP, PASSWORD};
use super::common::{connect, fast_config, temp_db, FakeBackend, PNG_BYTES};
use kyc_onboard::verification::EvidenceImage;
use kyc_onboard::{
    ErrorKind, Onboarding, OnboardingError, PersonalInfo, RecoveryAction, Resolution, StepKind,
    ValidationError,
};
use std::time::Duration;

fn info() -> PersonalInfo {
    PersonalInfo {
        full_name: "Asha Rao".into(),
        date_of_birth: "1990-01-15".into(),
        address: "12 MG Road, Bengaluru".into(),
        phone_number: "9876543210".into(),
        email: "asha@example.com".into(),
    }
}

fn image(name: &str) -> EvidenceImage {
    EvidenceImage::from_bytes(Some(name.into()), "image/png", PNG_BYTES.to_vec())
}

/// Walk from Welcome to Final Review with every step satisfied.
async fn walk_to_review(flow: &mut Onboarding) {
    flow.advance().await.unwrap();
    flow.update_personal_info(info()).await.unwrap();
    flow.advance().await.unwrap();
    flow.scan_document("PAN", image("pan.png")).await.unwrap();
    flow.advance().await.unwrap();
    flow.set_aadhaar_number("123456789012").await.unwrap();
    flow.send_otp().await.unwrap();
    flow.verify_otp(OTP).await.unwrap();
    flow.advance().await.unwrap();
    flow.verify_face(image("selfie.png")).await.unwrap();
    flow.advance().await.unwrap();
    assert_eq!(flow.workflow().current_kind(), StepKind::FinalReview);
}

#[tokio::test]
async fn test_complete_flow_submits_and_starts_over() {
    let backend = FakeBackend::start().await;
    let (db, _dir) = temp_db();
    let mut flow = connect(&fast_config(&backend.base_url()), &db);

    let outcome = flow.login("asha", PASSWORD).await.unwrap();
    assert!(!outcome.resumed);

    walk_to_review(&mut flow).await;
    let verdict = flow.check_duplicates(Some(image("selfie.png"))).await.unwrap();
    assert!(!verdict.is_duplicate);

    let response = flow.submit(true).await.unwrap();
    assert_eq!(response.user_id.as_deref(), Some("KYC-2026-0001"));
    assert_eq!(flow.workflow().current_kind(), StepKind::Completion);
    assert_eq!(
        flow.session().submission_reference.as_deref(),
        Some("KYC-2026-0001")
    );

    let submitted = backend.state.lock().submissions[0].clone();
    assert_eq!(submitted["consent"], true);
    assert_eq!(submitted["personalInfo"]["phoneNumber"], "9876543210");
    assert_eq!(submitted["documentData"]["extractedFields"]["documentNumber"], "ABCDE1234F");
    assert_eq!(submitted["aadhaarData"]["otpVerified"], true);
    assert_eq!(submitted["facialData"]["verified"], true);

    // The backend holds the final state
    let stored = backend.stored_progress().unwrap();
    assert_eq!(stored["currentStep"], 6);

    flow.start_new().await.unwrap();
    assert_eq!(flow.workflow().current_index(), 0);
    assert!(flow.session().submission_payload.is_empty());
    assert_eq!(backend.stored_progress().unwrap()["currentStep"], 0);
}

#[tokio::test]
async fn test_low_quality_scan_keeps_document_gate_closed() {
    let backend = FakeBackend::start().await;
    backend.state.lock().quality_score = 45.0;
    let (db, _dir) = temp_db();
    let mut flow = connect(&fast_config(&backend.base_url()), &db);
    flow.login("asha", PASSWORD).await.unwrap();

    flow.advance().await.unwrap();
    flow.update_personal_info(info()).await.unwrap();
    flow.advance().await.unwrap();

    let err = flow.scan_document("PAN", image("pan.png")).await.unwrap_err();
    assert_eq!(err.as_recoverable().unwrap().kind, ErrorKind::DocumentScanError);
    assert!(matches!(
        flow.advance().await,
        Err(OnboardingError::Validation(ValidationError::DocumentMissing))
    ));

    // A better photo clears the error through a retry
    backend.state.lock().quality_score = 91.0;
    let resolution = flow.resolve(RecoveryAction::RetryNow).await.unwrap();
    assert_eq!(resolution, Resolution::Resolved(RecoveryAction::RetryNow));
    assert_eq!(flow.session().document_capture.as_ref().unwrap().score, 91);
    assert!(flow.advance().await.unwrap().moved());
}

#[tokio::test]
async fn test_duplicate_applicant_blocks_submission() {
    let backend = FakeBackend::start().await;
    let (db, _dir) = temp_db();
    let mut flow = connect(&fast_config(&backend.base_url()), &db);
    flow.login("asha", PASSWORD).await.unwrap();
    walk_to_review(&mut flow).await;

    backend.state.lock().duplicate = true;
    let verdict = flow.check_duplicates(None).await.unwrap();
    assert!(verdict.is_duplicate);

    let err = flow.submit(true).await.unwrap_err();
    assert_eq!(err.as_validation(), Some(&ValidationError::DuplicateApplicant));
    assert_eq!(flow.workflow().current_kind(), StepKind::FinalReview);
    assert!(backend.state.lock().submissions.is_empty());
}

#[tokio::test]
async fn test_submit_failure_stays_on_review() {
    let backend = FakeBackend::start().await;
    let (db, _dir) = temp_db();
    let mut flow = connect(&fast_config(&backend.base_url()), &db);
    flow.login("asha", PASSWORD).await.unwrap();
    walk_to_review(&mut flow).await;

    let before = backend.hits("/kyc/submit");
    let err = flow.submit(false).await.unwrap_err();
    assert_eq!(err.as_validation(), Some(&ValidationError::ConsentRequired));
    assert_eq!(backend.hits("/kyc/submit"), before);

    backend.fail("/kyc/submit", 500, 3);
    let err = flow.submit(true).await.unwrap_err();
    assert_eq!(err.as_recoverable().unwrap().kind, ErrorKind::ServerError);
    assert_eq!(flow.workflow().current_kind(), StepKind::FinalReview);

    let plan = flow.active_error().unwrap();
    assert_eq!(
        plan.actions,
        vec![
            RecoveryAction::RetryNow,
            RecoveryAction::RestoreSnapshot,
            RecoveryAction::EscalateToSupport
        ]
    );
    flow.resolve(RecoveryAction::RetryNow).await.unwrap();
    assert_eq!(flow.workflow().current_kind(), StepKind::Completion);
}

#[tokio::test]
async fn test_face_mismatch_then_retry() {
    let backend = FakeBackend::start().await;
    backend.state.lock().face_confidence = 52.0;
    let (db, _dir) = temp_db();
    let mut flow = connect(&fast_config(&backend.base_url()), &db);
    flow.login("asha", PASSWORD).await.unwrap();

    let err = flow.verify_face(image("selfie.png")).await.unwrap_err();
    assert_eq!(
        err.as_recoverable().unwrap().kind,
        ErrorKind::FacialRecognitionError
    );
    assert!(!flow.session().facial_verification.verified);

    backend.state.lock().face_confidence = 96.0;
    flow.resolve(RecoveryAction::RetryNow).await.unwrap();
    assert!(flow.session().facial_verification.verified);
    assert_eq!(flow.session().facial_verification.confidence, 96);
}

#[tokio::test]
async fn test_wrong_otp_then_correct_one() {
    let backend = FakeBackend::start().await;
    let (db, _dir) = temp_db();
    let mut flow = connect(&fast_config(&backend.base_url()), &db);
    flow.login("asha", PASSWORD).await.unwrap();

    flow.set_aadhaar_number("123456789012").await.unwrap();
    assert!(matches!(
        flow.verify_otp(OTP).await,
        Err(OnboardingError::Validation(ValidationError::OtpNotSent))
    ));

    flow.send_otp().await.unwrap();
    assert!(matches!(
        flow.verify_otp("12ab").await,
        Err(OnboardingError::Validation(ValidationError::InvalidOtp))
    ));
    let err = flow.verify_otp("000000").await.unwrap_err();
    assert_eq!(err.as_recoverable().unwrap().kind, ErrorKind::AadhaarOtpError);
    assert!(!flow.session().aadhaar_verification.otp_verified);

    flow.verify_otp(OTP).await.unwrap();
    assert!(flow.session().aadhaar_verification.otp_verified);
    assert!(flow.session().aadhaar_verification.otp.is_empty());
}

#[tokio::test]
async fn test_rate_limit_waits_then_retries() {
    let backend = FakeBackend::start().await;
    let mut config = fast_config(&backend.base_url());
    config.recovery.rate_limit_wait = Duration::from_millis(50);
    let (db, _dir) = temp_db();
    let mut flow = connect(&config, &db);
    flow.login("asha", PASSWORD).await.unwrap();

    backend.fail("/kyc/dashboard", 429, 3);
    let err = flow.fetch_dashboard().await.unwrap_err();
    assert_eq!(err.as_recoverable().unwrap().kind, ErrorKind::RateLimitError);

    let resolution = flow.resolve(RecoveryAction::WaitThenRetry).await.unwrap();
    assert_eq!(resolution, Resolution::Resolved(RecoveryAction::WaitThenRetry));
    assert_eq!(backend.hits("/kyc/dashboard"), 4);
    assert!(flow.active_error().is_none());
}

#[tokio::test]
async fn test_scheduled_retry_is_cancelable() {
    let backend = FakeBackend::start().await;
    let mut config = fast_config(&backend.base_url());
    config.recovery.rate_limit_wait = Duration::from_secs(30);
    let (db, _dir) = temp_db();
    let mut flow = connect(&config, &db);
    flow.login("asha", PASSWORD).await.unwrap();

    backend.fail("/kyc/dashboard", 429, 3);
    flow.fetch_dashboard().await.unwrap_err();
    let canceller = flow.retry_canceller();

    let task = tokio::spawn(async move {
        let resolution = flow.resolve(RecoveryAction::WaitThenRetry).await;
        (resolution.unwrap(), flow)
    });
    while !canceller.is_pending() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(canceller.cancel());

    let (resolution, flow) = task.await.unwrap();
    assert_eq!(resolution, Resolution::Cancelled);
    assert_eq!(backend.hits("/kyc/dashboard"), 3);
    assert_eq!(
        flow.active_error().unwrap().error.kind,
        ErrorKind::RateLimitError
    );
}

#[tokio::test]
async fn test_expired_token_reauthenticate() {
    let backend = FakeBackend::start().await;
    let (db, _dir) = temp_db();
    let mut flow = connect(&fast_config(&backend.base_url()), &db);
    flow.login("asha", PASSWORD).await.unwrap();
    flow.advance().await.unwrap();

    flow.client().set_token("expired");
    let err = flow.fetch_dashboard().await.unwrap_err();
    assert_eq!(err.as_recoverable().unwrap().kind, ErrorKind::AuthError);

    flow.resolve(RecoveryAction::Reauthenticate).await.unwrap();
    assert!(!flow.is_logged_in());
    assert!(matches!(
        flow.advance().await,
        Err(OnboardingError::NotLoggedIn)
    ));

    // The backend still holds the last remote save, so logging back in resumes
    let outcome = flow.login("asha", PASSWORD).await.unwrap();
    assert!(outcome.resumed);
    assert_eq!(flow.workflow().current_index(), 1);
}
