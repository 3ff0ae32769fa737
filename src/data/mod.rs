//! Local key-value storage for session snapshots and fallback backups.
//!
//! Two scopes exist: the profile store survives restarts (SQLite under the data
//! directory), the tab store lives only as long as the process.

mod database;
mod migrations;
mod profile_store;
mod tab_store;

use thiserror::Error;

pub use database::{Database, DatabaseError};
pub use profile_store::ProfileStore;
pub use tab_store::TabStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Lock poisoned")]
    LockPoisoned,
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Lifetime of a local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreScope {
    /// Durable, shared by every run on this profile
    Profile,
    /// Ephemeral, dropped with the process
    Tab,
}

impl StoreScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreScope::Profile => "profile",
            StoreScope::Tab => "tab",
        }
    }
}

impl std::fmt::Display for StoreScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String key-value store used by the persistence fallback chain.
pub trait KeyValueStore: Send + Sync {
    fn scope(&self) -> StoreScope;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}
