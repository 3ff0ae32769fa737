//! Progress persistence and recovery across restarts.
//!
//! Each "restart" builds a new `Onboarding` on the same profile database, so
//! the tab store and the breaker start fresh while profile backups survive.

use super::common::backend::{OTP, PASSWORD};
use super::common::{connect, fast_config, temp_db, FakeBackend, PNG_BYTES};
use kyc_onboard::data::{KeyValueStore, StoreScope};
use kyc_onboard::persistence::{BACKUP_KEY, SESSION_KEY};
use kyc_onboard::verification::EvidenceImage;
use kyc_onboard::{PersonalInfo, ProfileStore, Session, Snapshot};

fn info() -> PersonalInfo {
    PersonalInfo {
        full_name: "Asha Rao".into(),
        date_of_birth: "1990-01-15".into(),
        address: "12 MG Road, Bengaluru".into(),
        phone_number: "9876543210".into(),
        email: "asha@example.com".into(),
    }
}

fn image() -> EvidenceImage {
    EvidenceImage::from_bytes(Some("capture.png".into()), "image/png", PNG_BYTES.to_vec())
}

#[tokio::test]
async fn test_session_round_trips_across_restart() {
    let backend = FakeBackend::start().await;
    let (db, _dir) = temp_db();
    let config = fast_config(&backend.base_url());

    let mut first = connect(&config, &db);
    first.login("asha", PASSWORD).await.unwrap();
    first.advance().await.unwrap();
    first.update_personal_info(info()).await.unwrap();
    first.advance().await.unwrap();
    first.scan_document("PAN", image()).await.unwrap();
    first.advance().await.unwrap();
    first.set_aadhaar_number("123456789012").await.unwrap();
    first.send_otp().await.unwrap();
    first.verify_otp(OTP).await.unwrap();
    first.advance().await.unwrap();
    first.verify_face(image()).await.unwrap();
    let saved = first.session().clone();
    drop(first);

    let mut second = connect(&config, &db);
    let outcome = second.login("asha", PASSWORD).await.unwrap();
    assert!(outcome.resumed);

    let restored = second.session();
    assert_eq!(restored.current_step_index, saved.current_step_index);
    assert_eq!(restored.personal_info, saved.personal_info);
    assert_eq!(restored.document_capture, saved.document_capture);
    assert!(restored.aadhaar_verification.otp_verified);
    assert_eq!(restored.aadhaar_verification.number, "123456789012");
    assert_eq!(restored.facial_verification, saved.facial_verification);
    assert_eq!(restored.submission_payload, saved.submission_payload);
    assert_ne!(restored.session_id, saved.session_id);
}

#[tokio::test]
async fn test_backup_written_during_outage_is_replayed() {
    let backend = FakeBackend::start().await;
    let (db, _dir) = temp_db();
    let config = fast_config(&backend.base_url());

    let mut first = connect(&config, &db);
    first.login("asha", PASSWORD).await.unwrap();
    first.advance().await.unwrap();
    first.update_personal_info(info()).await.unwrap();

    backend.fail("/kyc/save-progress", 503, 3);
    first.advance().await.unwrap();
    assert!(first.active_error().is_none());
    assert_eq!(backend.stored_progress().unwrap()["currentStep"], 1);
    drop(first);

    let profile = ProfileStore::new(db.connection());
    assert!(profile.get(BACKUP_KEY).unwrap().is_some());

    let mut second = connect(&config, &db);
    let outcome = second.login("asha", PASSWORD).await.unwrap();
    assert!(outcome.recovery.remote_reachable);
    assert_eq!(outcome.recovery.pushed, vec![StoreScope::Profile]);
    assert_eq!(second.workflow().current_index(), 2);
    assert_eq!(second.session().personal_info, info());

    assert!(profile.get(BACKUP_KEY).unwrap().is_none());
    let stored = backend.stored_progress().unwrap();
    assert_eq!(stored["currentStep"], 2);
    assert_eq!(stored["kycSession"]["version"], 3);
}

#[tokio::test]
async fn test_unreachable_remote_returns_local_backup_and_keeps_it() {
    let backend = FakeBackend::start().await;
    let (db, _dir) = temp_db();
    let config = fast_config(&backend.base_url());

    let mut first = connect(&config, &db);
    first.login("asha", PASSWORD).await.unwrap();
    first.advance().await.unwrap();
    first.update_personal_info(info()).await.unwrap();
    backend.fail("/kyc/save-progress", 503, 3);
    first.advance().await.unwrap();
    drop(first);

    backend.fail("/kyc/progress", 503, 3);
    let mut second = connect(&config, &db);
    let outcome = second.login("asha", PASSWORD).await.unwrap();
    assert!(!outcome.recovery.remote_reachable);
    assert_eq!(outcome.recovery.retained, vec![StoreScope::Profile]);
    assert!(outcome.recovery.pushed.is_empty());
    assert_eq!(second.workflow().current_index(), 2);

    // The next save reaches the backend with a newer version, so the kept
    // backup becomes stale
    second.retreat().await.unwrap();
    drop(second);

    let mut third = connect(&config, &db);
    let outcome = third.login("asha", PASSWORD).await.unwrap();
    assert_eq!(outcome.recovery.discarded, vec![StoreScope::Profile]);
    assert_eq!(third.workflow().current_index(), 1);
}

#[tokio::test]
async fn test_stale_and_corrupted_backups_are_discarded() {
    let backend = FakeBackend::start().await;
    let (db, _dir) = temp_db();
    let config = fast_config(&backend.base_url());

    let mut first = connect(&config, &db);
    first.login("asha", PASSWORD).await.unwrap();
    first.advance().await.unwrap();
    first.update_personal_info(info()).await.unwrap();
    drop(first);

    let profile = ProfileStore::new(db.connection());
    let mut old = Session::with_id("old");
    old.current_step_index = 4;
    let stale = Snapshot::new(1, old).seal().unwrap();
    profile.set(BACKUP_KEY, &stale).unwrap();

    let mut second = connect(&config, &db);
    let outcome = second.login("asha", PASSWORD).await.unwrap();
    assert_eq!(outcome.recovery.discarded, vec![StoreScope::Profile]);
    assert_eq!(second.workflow().current_index(), 1);
    assert!(profile.get(BACKUP_KEY).unwrap().is_none());
    drop(second);

    let stale = profile.get(SESSION_KEY).unwrap().unwrap();
    let tampered = stale.replace("Asha Rao", "Mallory");
    profile.set(BACKUP_KEY, &tampered).unwrap();

    let mut third = connect(&config, &db);
    let outcome = third.login("asha", PASSWORD).await.unwrap();
    assert_eq!(outcome.recovery.discarded, vec![StoreScope::Profile]);
    assert_eq!(third.session().personal_info.full_name, "Asha Rao");
}

#[tokio::test]
async fn test_logout_clears_local_copies() {
    let backend = FakeBackend::start().await;
    let (db, _dir) = temp_db();
    let config = fast_config(&backend.base_url());

    let mut flow = connect(&config, &db);
    flow.login("asha", PASSWORD).await.unwrap();
    backend.fail("/kyc/save-progress", 503, 3);
    flow.advance().await.unwrap();

    let profile = ProfileStore::new(db.connection());
    assert!(profile.get(SESSION_KEY).unwrap().is_some());
    assert!(profile.get(BACKUP_KEY).unwrap().is_some());

    flow.logout();
    assert!(profile.get(SESSION_KEY).unwrap().is_none());
    assert!(profile.get(BACKUP_KEY).unwrap().is_none());
    assert_eq!(flow.workflow().current_index(), 0);
}
