//! Session persistence with a remote-first fallback chain.
//!
//! `persist` writes the remote store, falling back to the profile store and
//! then the tab store. `recover` reconciles whatever the fallbacks hold with
//! the remote copy at session start.

mod manager;
mod remote;

use async_trait::async_trait;
use serde::Serialize;

use crate::data::StoreScope;
use crate::error::RecoverableError;
use crate::session::Snapshot;

pub use manager::{PersistReceipt, ProgressManager, RecoveryReport, EXHAUSTED_MESSAGE};

/// Profile-store key for the latest local copy of the session
pub const SESSION_KEY: &str = "kyc_progress";
/// Key for fallback backups in both local stores
pub const BACKUP_KEY: &str = "kyc_progress_backup";

/// Where a snapshot ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistTier {
    Remote,
    ProfileBackup,
    TabBackup,
    /// A newer snapshot was already written
    Superseded,
}

impl PersistTier {
    pub fn for_scope(scope: StoreScope) -> Self {
        match scope {
            StoreScope::Profile => PersistTier::ProfileBackup,
            StoreScope::Tab => PersistTier::TabBackup,
        }
    }
}

/// Authoritative store for session snapshots.
#[async_trait]
pub trait RemoteProgressStore: Send + Sync {
    async fn save(&self, snapshot: &Snapshot) -> Result<(), RecoverableError>;

    /// Latest stored snapshot; `session_id` is used when the stored form
    /// predates versioned snapshots.
    async fn fetch(&self, session_id: &str) -> Result<Option<Snapshot>, RecoverableError>;
}
