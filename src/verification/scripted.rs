use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::RecoverableError;
use crate::session::{CaptureKind, CaptureResult, PersonalInfo};

use super::{
    DocumentAnalyzer, DuplicateChecker, DuplicateVerdict, EvidenceImage, FaceMatch, FaceMatcher,
};

#[derive(Default)]
struct Script {
    documents: VecDeque<Result<CaptureResult, RecoverableError>>,
    faces: VecDeque<Result<FaceMatch, RecoverableError>>,
    duplicates: VecDeque<Result<DuplicateVerdict, RecoverableError>>,
    calls: usize,
}

/// Deterministic verifier for tests and offline runs.
///
/// Queued outcomes are returned in order; once a queue is empty every call
/// succeeds with a clean sample result.
#[derive(Default)]
pub struct ScriptedVerifier {
    script: Mutex<Script>,
}

impl ScriptedVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_document(&self, outcome: Result<CaptureResult, RecoverableError>) -> &Self {
        self.script.lock().documents.push_back(outcome);
        self
    }

    pub fn push_face(&self, outcome: Result<FaceMatch, RecoverableError>) -> &Self {
        self.script.lock().faces.push_back(outcome);
        self
    }

    pub fn push_duplicate(&self, outcome: Result<DuplicateVerdict, RecoverableError>) -> &Self {
        self.script.lock().duplicates.push_back(outcome);
        self
    }

    /// Total calls across all three services
    pub fn calls(&self) -> usize {
        self.script.lock().calls
    }

    pub fn sample_document() -> CaptureResult {
        let extracted_fields = [
            ("fullName", "Asha Rao"),
            ("documentNumber", "ABCDE1234F"),
            ("dateOfBirth", "1990-01-15"),
            ("expiryDate", "2030-12-31"),
            ("nationality", "Indian"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<BTreeMap<_, _>>();

        CaptureResult {
            kind: CaptureKind::Document,
            label: "PAN".to_string(),
            extracted_fields,
            score: 85,
            evidence: Some("sample-pan.png".to_string()),
        }
    }

    pub fn sample_face() -> FaceMatch {
        FaceMatch {
            verified: true,
            capture: CaptureResult::facial(92.0, Some("sample-selfie.png".to_string())),
        }
    }
}

#[async_trait]
impl DocumentAnalyzer for ScriptedVerifier {
    async fn analyze(
        &self,
        document_type: &str,
        image: &EvidenceImage,
    ) -> Result<CaptureResult, RecoverableError> {
        let mut script = self.script.lock();
        script.calls += 1;
        script.documents.pop_front().unwrap_or_else(|| {
            Ok(CaptureResult {
                label: document_type.to_string(),
                evidence: Some(image.reference()),
                ..Self::sample_document()
            })
        })
    }
}

#[async_trait]
impl FaceMatcher for ScriptedVerifier {
    async fn match_face(&self, _image: &EvidenceImage) -> Result<FaceMatch, RecoverableError> {
        let mut script = self.script.lock();
        script.calls += 1;
        script
            .faces
            .pop_front()
            .unwrap_or_else(|| Ok(Self::sample_face()))
    }
}

#[async_trait]
impl DuplicateChecker for ScriptedVerifier {
    async fn check(
        &self,
        _personal_info: &PersonalInfo,
        _biometric: Option<&EvidenceImage>,
    ) -> Result<DuplicateVerdict, RecoverableError> {
        let mut script = self.script.lock();
        script.calls += 1;
        script.duplicates.pop_front().unwrap_or(Ok(DuplicateVerdict {
            is_duplicate: false,
            message: Some("No duplicates found".to_string()),
        }))
    }
}
