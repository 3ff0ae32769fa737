//! Locations under the kyc-onboard data directory

use std::path::PathBuf;
use std::sync::OnceLock;

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Pin the data directory for this process. Call once from `main` before
/// anything opens the profile database or the log file; later calls are
/// ignored.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    if let Err(rejected) = DATA_DIR.set(path) {
        tracing::debug!(
            path = %rejected.display(),
            "Data directory already set, keeping the first one"
        );
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".kyc-onboard"))
        .unwrap_or_else(|| PathBuf::from(".kyc-onboard"))
}

/// The pinned data directory, or `~/.kyc-onboard`
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// SQLite file behind the profile store
pub fn database_path() -> PathBuf {
    data_dir().join("profile.db")
}

pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

pub fn log_file_path() -> PathBuf {
    logs_dir().join("kyc-onboard.log")
}

pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}
