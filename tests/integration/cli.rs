//! Binary tests: argument handling and full runs against the fake backend.

use super::common::backend::PASSWORD;
use super::common::{write_answers, FakeBackend};
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn kyc(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kyc-onboard").expect("binary built");
    cmd.arg("--data-dir").arg(data_dir);
    cmd.env_remove("KYC_ONBOARD_PASSWORD");
    cmd
}

/// Run a blocking command without stalling the backend's runtime.
async fn run_blocking(mut cmd: Command) -> assert_cmd::assert::Assert {
    tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .expect("command task")
}

#[test]
fn test_steps_lists_the_table() {
    let dir = TempDir::new().unwrap();
    kyc(dir.path())
        .arg("steps")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Welcome"))
        .stdout(predicate::str::contains("4. Aadhaar OTP"))
        .stdout(predicate::str::contains("7. Completion"));

    assert!(dir.path().join("logs").join("kyc-onboard.log").exists());
}

#[test]
fn test_config_set_api_url_writes_file() {
    let dir = TempDir::new().unwrap();
    kyc(dir.path())
        .args(["config", "set-api-url", "https://kyc.example.com/api/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://kyc.example.com/api"));

    let contents = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(contents.contains(r#"base_url = "https://kyc.example.com/api""#));
}

#[test]
fn test_missing_password_is_reported() {
    let dir = TempDir::new().unwrap();
    kyc(dir.path())
        .args(["login", "-u", "asha"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KYC_ONBOARD_PASSWORD"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wrong_password_shows_recovery_options() {
    let backend = FakeBackend::start().await;
    let dir = TempDir::new().unwrap();

    let mut cmd = kyc(dir.path());
    cmd.args(["--api-url", &backend.base_url(), "login", "-u", "asha", "-p", "wrong"]);
    run_blocking(cmd)
        .await
        .failure()
        .stderr(predicate::str::contains("AUTH_ERROR"))
        .stderr(predicate::str::contains("Log in again"))
        .stderr(predicate::str::contains("Contact support"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_completes_flow_then_progress_reports_it() {
    let backend = FakeBackend::start().await;
    let dir = TempDir::new().unwrap();
    let answers = write_answers(dir.path());

    let mut cmd = kyc(dir.path());
    cmd.args(["--api-url", &backend.base_url(), "run", "-u", "asha", "--answers"])
        .arg(&answers)
        .env("KYC_ONBOARD_PASSWORD", PASSWORD);
    run_blocking(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Step 3/7: PAN Upload"))
        .stdout(predicate::str::contains("OTP sent to the number linked with XXXX-XXXX-9012"))
        .stdout(predicate::str::contains("Reference: KYC-2026-0001"));

    assert_eq!(backend.state.lock().submissions.len(), 1);

    let mut cmd = kyc(dir.path());
    cmd.args(["--api-url", &backend.base_url(), "progress", "-u", "asha", "-p", PASSWORD]);
    run_blocking(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("7/7 Completion"))
        .stdout(predicate::str::contains("Reference:   KYC-2026-0001"))
        .stdout(predicate::str::contains("123456789012").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_without_consent_stops_at_review() {
    let backend = FakeBackend::start().await;
    let dir = TempDir::new().unwrap();
    let answers = write_answers(dir.path());
    let contents = std::fs::read_to_string(&answers)
        .unwrap()
        .replace("consent = true", "consent = false");
    std::fs::write(&answers, contents).unwrap();

    let mut cmd = kyc(dir.path());
    cmd.args(["--api-url", &backend.base_url(), "run", "-u", "asha", "-p", PASSWORD, "--answers"])
        .arg(&answers);
    run_blocking(cmd)
        .await
        .failure()
        .stdout(predicate::str::contains("Step 6/7: Final Review"))
        .stderr(predicate::str::contains("consent").or(predicate::str::contains("Consent")));

    assert!(backend.state.lock().submissions.is_empty());
    assert_eq!(backend.stored_progress().unwrap()["currentStep"], 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dashboard_prints_statistics() {
    let backend = FakeBackend::start().await;
    let dir = TempDir::new().unwrap();

    let mut cmd = kyc(dir.path());
    cmd.args(["--api-url", &backend.base_url(), "dashboard", "-u", "asha", "-p", PASSWORD]);
    run_blocking(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Total attempts:  12"))
        .stdout(predicate::str::contains("Success rate:    75.0%"))
        .stdout(predicate::str::contains("PAN Upload"));
}
