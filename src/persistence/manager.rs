use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::data::{KeyValueStore, StoreScope};
use crate::error::{ErrorKind, RecoverableError};
use crate::session::{Session, Snapshot};

use super::{PersistTier, RemoteProgressStore, BACKUP_KEY, SESSION_KEY};

pub const EXHAUSTED_MESSAGE: &str =
    "Unable to save progress. Please check your connection and try again.";

/// Outcome of a successful `persist`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersistReceipt {
    pub version: u64,
    pub tier: PersistTier,
}

/// What `recover` found and did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoveryReport {
    /// Newest snapshot seen anywhere
    pub snapshot: Option<Snapshot>,
    pub remote_reachable: bool,
    /// Backups replayed to the remote store and deleted
    pub pushed: Vec<StoreScope>,
    /// Backups deleted as stale or corrupted
    pub discarded: Vec<StoreScope>,
    /// Backups kept for a later attempt
    pub retained: Vec<StoreScope>,
}

#[derive(Debug, Default)]
struct WriterState {
    /// Highest version that reached any tier
    last_written: u64,
    /// Highest version the remote store accepted
    last_remote: u64,
}

/// Serializes snapshot writes for one session and runs the fallback chain.
pub struct ProgressManager {
    remote: Arc<dyn RemoteProgressStore>,
    profile: Arc<dyn KeyValueStore>,
    tab: Arc<dyn KeyValueStore>,
    // tokio's Mutex queues waiters in FIFO order
    writer: Mutex<WriterState>,
    next_version: AtomicU64,
    offline: AtomicBool,
}

impl ProgressManager {
    pub fn new(
        remote: Arc<dyn RemoteProgressStore>,
        profile: Arc<dyn KeyValueStore>,
        tab: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            remote,
            profile,
            tab,
            writer: Mutex::new(WriterState::default()),
            next_version: AtomicU64::new(0),
            offline: AtomicBool::new(false),
        }
    }

    /// Skip the remote tier until turned back off (degraded mode).
    pub fn set_offline(&self, offline: bool) {
        if self.offline.swap(offline, Ordering::SeqCst) != offline {
            tracing::info!(offline, "Persistence mode changed");
        }
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    fn local_stores(&self) -> [&Arc<dyn KeyValueStore>; 2] {
        [&self.profile, &self.tab]
    }

    /// Snapshot `session` and store it in the first tier that accepts it.
    ///
    /// The local mirror is written first, best effort and under the same
    /// writer lock, so it never goes back to an older version. Fails with
    /// `PERSISTENCE_EXHAUSTED` only when no tier accepts the snapshot; the
    /// session itself stays untouched in memory either way.
    pub async fn persist(&self, session: &Session) -> Result<PersistReceipt, RecoverableError> {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Snapshot::new(version, session.clone());
        let sealed = snapshot.seal().map_err(|e| {
            tracing::error!(error = %e, "Failed to encode snapshot");
            RecoverableError::new(ErrorKind::PersistenceExhausted, EXHAUSTED_MESSAGE)
        })?;

        let mut state = self.writer.lock().await;
        if version <= state.last_written {
            tracing::debug!(version, last = state.last_written, "Skipping superseded snapshot");
            return Ok(PersistReceipt {
                version,
                tier: PersistTier::Superseded,
            });
        }

        if let Err(e) = self.profile.set(SESSION_KEY, &sealed) {
            tracing::warn!(error = %e, "Failed to write local session mirror");
        }

        if !self.is_offline() {
            match self.remote.save(&snapshot).await {
                Ok(()) => {
                    state.last_written = version;
                    state.last_remote = version;
                    return Ok(PersistReceipt {
                        version,
                        tier: PersistTier::Remote,
                    });
                }
                Err(e) => {
                    tracing::warn!(version, kind = %e.kind, "Remote save failed, falling back to local backup");
                }
            }
        }

        for store in self.local_stores() {
            match store.set(BACKUP_KEY, &sealed) {
                Ok(()) => {
                    state.last_written = version;
                    tracing::info!(version, scope = %store.scope(), "Progress saved to local backup");
                    return Ok(PersistReceipt {
                        version,
                        tier: PersistTier::for_scope(store.scope()),
                    });
                }
                Err(e) => {
                    tracing::warn!(scope = %store.scope(), error = %e, "Local backup failed");
                }
            }
        }

        tracing::error!(version, "Every persistence tier failed");
        Err(RecoverableError::new(
            ErrorKind::PersistenceExhausted,
            EXHAUSTED_MESSAGE,
        ))
    }

    /// Reconcile local backups with the remote store.
    ///
    /// Backups older than the remote snapshot are dropped; newer ones are
    /// pushed and deleted once the remote accepts them. Nothing is pushed
    /// when the remote could not be read. The returned snapshot is the
    /// newest one seen, including the local mirror.
    pub async fn recover(&self, session_id: &str) -> RecoveryReport {
        let mut state = self.writer.lock().await;
        let mut report = RecoveryReport::default();

        let mut remote = None;
        if !self.is_offline() {
            match self.remote.fetch(session_id).await {
                Ok(snapshot) => {
                    report.remote_reachable = true;
                    remote = snapshot;
                }
                Err(e) => tracing::warn!(kind = %e.kind, "Could not fetch remote progress"),
            }
        }
        let mut newest = remote.clone();

        for store in self.local_stores() {
            let scope = store.scope();
            let raw = match store.get(BACKUP_KEY) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(scope = %scope, error = %e, "Could not read local backup");
                    continue;
                }
            };

            let backup = match Snapshot::unseal(&raw) {
                Ok(backup) => backup,
                Err(e) => {
                    tracing::warn!(scope = %scope, error = %e, "Discarding corrupted backup");
                    delete_backup(store.as_ref());
                    report.discarded.push(scope);
                    continue;
                }
            };

            if remote.as_ref().is_some_and(|r| !backup.is_newer_than(r)) {
                tracing::info!(scope = %scope, version = backup.version, "Discarding stale backup");
                delete_backup(store.as_ref());
                report.discarded.push(scope);
                continue;
            }

            if report.remote_reachable {
                match self.remote.save(&backup).await {
                    Ok(()) => {
                        tracing::info!(scope = %scope, version = backup.version, "Backup restored to remote");
                        delete_backup(store.as_ref());
                        report.pushed.push(scope);
                        state.last_remote = state.last_remote.max(backup.version);
                        remote = Some(backup.clone());
                    }
                    Err(e) => {
                        tracing::warn!(scope = %scope, kind = %e.kind, "Backup push failed, keeping it");
                        report.retained.push(scope);
                    }
                }
            } else {
                report.retained.push(scope);
            }

            newest = pick_newer(newest, backup);
        }

        if let Some(mirror) = self.last_snapshot() {
            newest = pick_newer(newest, mirror);
        }

        if let Some(snapshot) = &newest {
            state.last_written = state.last_written.max(snapshot.version);
            self.next_version
                .fetch_max(snapshot.version, Ordering::SeqCst);
        }

        tracing::debug!(
            version = newest.as_ref().map(|s| s.version),
            pushed = report.pushed.len(),
            discarded = report.discarded.len(),
            retained = report.retained.len(),
            "Recovery finished"
        );
        report.snapshot = newest;
        report
    }

    /// Latest local mirror of the session, if readable.
    pub fn last_snapshot(&self) -> Option<Snapshot> {
        let raw = match self.profile.get(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read local session mirror");
                return None;
            }
        };
        match Snapshot::unseal(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring corrupted session mirror");
                None
            }
        }
    }

    /// Forget every local copy (logout).
    pub fn clear(&self) {
        if let Err(e) = self.profile.delete(SESSION_KEY) {
            tracing::warn!(error = %e, "Failed to delete local session mirror");
        }
        for store in self.local_stores() {
            delete_backup(store.as_ref());
        }
    }
}

fn delete_backup(store: &dyn KeyValueStore) {
    if let Err(e) = store.delete(BACKUP_KEY) {
        tracing::warn!(scope = %store.scope(), error = %e, "Failed to delete backup");
    }
}

fn pick_newer(current: Option<Snapshot>, candidate: Snapshot) -> Option<Snapshot> {
    match current {
        Some(current) if !candidate.is_newer_than(&current) => Some(current),
        _ => Some(candidate),
    }
}
