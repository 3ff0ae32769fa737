//! Shared test utilities for kyc-onboard
//!
//! - An axum fake of the KYC backend on an ephemeral port
//! - Temporary profile stores and fast retry configs
//! - Image and answers fixtures

#![allow(dead_code)]

pub mod backend;

use std::path::{Path, PathBuf};
use std::time::Duration;

use kyc_onboard::{BreakerConfig, Config, Database, Onboarding, RetryPolicy};
use tempfile::TempDir;

pub use backend::FakeBackend;

/// Minimal PNG header; the fake backend only checks the data URL prefix.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Config pointed at `base_url` with millisecond backoff.
pub fn fast_config(base_url: &str) -> Config {
    let mut config = Config::default().with_api_url(base_url);
    config.retry = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(5),
    };
    config.breaker = BreakerConfig {
        failure_threshold: 5,
        cooldown: Duration::from_millis(200),
    };
    config.api.request_timeout = Duration::from_secs(5);
    config
}

/// A profile database in a fresh temporary directory.
pub fn temp_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open(dir.path().join("profile.db")).expect("Failed to open database");
    (db, dir)
}

/// Onboarding wired to the real HTTP transport and a temporary profile store.
pub fn connect(config: &Config, db: &Database) -> Onboarding {
    Onboarding::connect(config, db).expect("Failed to build onboarding")
}

pub fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, PNG_BYTES).expect("Failed to write image");
    path
}

/// Answers for a complete, consenting run with images in `dir`.
pub fn write_answers(dir: &Path) -> PathBuf {
    write_image(dir, "pan.png");
    write_image(dir, "selfie.png");
    let path = dir.join("answers.toml");
    std::fs::write(
        &path,
        r#"
selfie = "selfie.png"
consent = true

[personal_info]
full_name = "Asha Rao"
date_of_birth = "1990-01-15"
address = "12 MG Road, Bengaluru"
phone_number = "9876543210"
email = "asha@example.com"

[document]
image = "pan.png"

[aadhaar]
number = "123456789012"
otp = "123456"
"#,
    )
    .expect("Failed to write answers");
    path
}
