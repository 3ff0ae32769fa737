//! Versioned, checksummed persisted form of a [`Session`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::api::types::{DocumentScanResponse, ProgressResponse};

use super::{AadhaarVerification, CaptureResult, PersonalInfo, Session};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("Failed to decode snapshot: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Snapshot checksum mismatch")]
    ChecksumMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u64,
    pub saved_at: DateTime<Utc>,
    pub session: Session,
}

/// On-disk wrapper for local backups.
#[derive(Serialize, Deserialize)]
struct Sealed {
    checksum: String,
    body: String,
}

fn checksum(body: &str) -> String {
    format!("{:x}", Sha256::digest(body.as_bytes()))
}

impl Snapshot {
    pub fn new(version: u64, session: Session) -> Self {
        Self {
            version,
            saved_at: Utc::now(),
            session,
        }
    }

    /// Ordering used to resolve conflicts: version first, then save time.
    pub fn is_newer_than(&self, other: &Snapshot) -> bool {
        (self.version, self.saved_at) > (other.version, other.saved_at)
    }

    /// Serialize with a SHA-256 checksum of the body.
    pub fn seal(&self) -> Result<String, SnapshotError> {
        let body = serde_json::to_string(self).map_err(SnapshotError::Encode)?;
        let sealed = Sealed {
            checksum: checksum(&body),
            body,
        };
        serde_json::to_string(&sealed).map_err(SnapshotError::Encode)
    }

    /// Inverse of [`seal`](Self::seal). Fails on any tampering or truncation.
    pub fn unseal(raw: &str) -> Result<Self, SnapshotError> {
        let sealed: Sealed = serde_json::from_str(raw).map_err(SnapshotError::Decode)?;
        if checksum(&sealed.body) != sealed.checksum {
            return Err(SnapshotError::ChecksumMismatch);
        }
        serde_json::from_str(&sealed.body).map_err(SnapshotError::Decode)
    }

    /// Body for `save-progress`: the snapshot under `kycSession`, plus the
    /// flat fields older readers look at.
    pub fn to_progress_data(&self) -> Result<Value, SnapshotError> {
        let session = &self.session;
        Ok(json!({
            "currentStep": session.current_step_index,
            "personalInfo": serde_json::to_value(&session.personal_info).map_err(SnapshotError::Encode)?,
            "documentData": serde_json::to_value(&session.document_capture).map_err(SnapshotError::Encode)?,
            "aadhaarData": serde_json::to_value(&session.aadhaar_verification).map_err(SnapshotError::Encode)?,
            "facialVerified": session.facial_verification.verified,
            "kycSession": serde_json::to_value(self).map_err(SnapshotError::Encode)?,
        }))
    }

    /// Read stored progress back.
    ///
    /// Prefers the versioned `kycSession`. Progress written in the flat
    /// layout becomes a version-0 snapshot dated at the epoch so that any
    /// versioned snapshot outranks it. Returns `None` when nothing is stored.
    pub fn from_progress(
        progress: &ProgressResponse,
        session_id: &str,
    ) -> Result<Option<Self>, SnapshotError> {
        if let Some(raw) = progress.kyc_session.as_ref().filter(|v| v.get("version").is_some()) {
            return serde_json::from_value(raw.clone())
                .map(Some)
                .map_err(SnapshotError::Decode);
        }

        let Some(current_step) = progress.current_step else {
            return Ok(None);
        };

        let mut session = Session::with_id(session_id);
        session.current_step_index = current_step;
        if let Some(info) = &progress.personal_info {
            session.personal_info =
                serde_json::from_value::<PersonalInfo>(info.clone()).map_err(SnapshotError::Decode)?;
        }
        if let Some(aadhaar) = &progress.aadhaar_data {
            session.aadhaar_verification = serde_json::from_value::<AadhaarVerification>(aadhaar.clone())
                .map_err(SnapshotError::Decode)?;
        }
        if let Some(document) = progress.document_data.as_ref().filter(|v| !v.is_null()) {
            let scan: DocumentScanResponse =
                serde_json::from_value(document.clone()).map_err(SnapshotError::Decode)?;
            session.document_capture = Some(CaptureResult::from_document_scan("ID Proof", &scan, None));
        }
        session.facial_verification.verified = progress.facial_verified.unwrap_or(false);

        Ok(Some(Self {
            version: 0,
            saved_at: DateTime::<Utc>::UNIX_EPOCH,
            session,
        }))
    }
}
