//! Document, face and duplicate verification behind swappable strategies.
//!
//! The onboarding flow only talks to these traits. [`RemoteVerifier`] goes
//! through the gateway client; [`ScriptedVerifier`] returns canned outcomes.

mod image;
mod remote;
mod scripted;

use async_trait::async_trait;

use crate::error::{ErrorKind, RecoverableError};
use crate::session::{CaptureResult, PersonalInfo};

pub use image::EvidenceImage;
pub use remote::RemoteVerifier;
pub use scripted::ScriptedVerifier;

pub const LOW_QUALITY_MESSAGE: &str =
    "Document quality is too low. Please retake the photo in good lighting with all edges visible.";
pub const FACE_MISMATCH_MESSAGE: &str = "Facial verification failed. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceMatch {
    pub verified: bool,
    pub capture: CaptureResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateVerdict {
    pub is_duplicate: bool,
    pub message: Option<String>,
}

#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        document_type: &str,
        image: &EvidenceImage,
    ) -> Result<CaptureResult, RecoverableError>;
}

#[async_trait]
pub trait FaceMatcher: Send + Sync {
    async fn match_face(&self, image: &EvidenceImage) -> Result<FaceMatch, RecoverableError>;
}

#[async_trait]
pub trait DuplicateChecker: Send + Sync {
    async fn check(
        &self,
        personal_info: &PersonalInfo,
        biometric: Option<&EvidenceImage>,
    ) -> Result<DuplicateVerdict, RecoverableError>;
}

/// Reject captures whose quality score is below `min_score`.
pub fn check_document_quality(
    capture: &CaptureResult,
    min_score: u8,
) -> Result<(), RecoverableError> {
    if capture.score < min_score {
        tracing::info!(score = capture.score, min_score, "Document capture rejected");
        return Err(RecoverableError::new(
            ErrorKind::DocumentScanError,
            LOW_QUALITY_MESSAGE,
        ));
    }
    Ok(())
}
