use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::api::types::DocumentScanResponse;
use crate::util::mask_aadhaar;

/// Placeholder for a field the capture could not read.
pub const NOT_DETECTED: &str = "Not detected";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub date_of_birth: String,
    pub address: String,
    pub phone_number: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Document,
    Facial,
}

/// Outcome of a document or facial capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub kind: CaptureKind,
    /// Document type for documents, e.g. `PAN`
    pub label: String,
    #[serde(default)]
    pub extracted_fields: BTreeMap<String, String>,
    /// Quality score (documents) or match confidence (faces), 0-100
    pub score: u8,
    /// File name or other reference to the captured image
    #[serde(default)]
    pub evidence: Option<String>,
}

impl CaptureResult {
    pub const DOCUMENT_FIELDS: [&'static str; 5] = [
        "fullName",
        "documentNumber",
        "dateOfBirth",
        "expiryDate",
        "nationality",
    ];

    pub fn from_document_scan(
        label: &str,
        scan: &DocumentScanResponse,
        evidence: Option<String>,
    ) -> Self {
        let values = [
            &scan.full_name,
            &scan.document_number,
            &scan.date_of_birth,
            &scan.expiry_date,
            &scan.nationality,
        ];
        let extracted_fields = Self::DOCUMENT_FIELDS
            .iter()
            .zip(values)
            .map(|(name, value)| {
                let value = value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .unwrap_or(NOT_DETECTED);
                (name.to_string(), value.to_string())
            })
            .collect();

        Self {
            kind: CaptureKind::Document,
            label: scan
                .document_type
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| label.to_string()),
            extracted_fields,
            score: clamp_score(scan.quality_score),
            evidence,
        }
    }

    pub fn facial(confidence: f64, evidence: Option<String>) -> Self {
        Self {
            kind: CaptureKind::Facial,
            label: "Face".to_string(),
            extracted_fields: BTreeMap::new(),
            score: clamp_score(confidence),
            evidence,
        }
    }

    /// Extracted value, or `None` when missing or not detected.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.extracted_fields
            .get(name)
            .map(String::as_str)
            .filter(|v| *v != NOT_DETECTED)
    }
}

pub(crate) fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        0
    } else {
        score.round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AadhaarVerification {
    #[serde(rename = "aadhaarNumber")]
    pub number: String,
    /// Typed OTP; never persisted
    #[serde(skip)]
    pub otp: String,
    pub otp_sent: bool,
    pub otp_verified: bool,
}

impl fmt::Debug for AadhaarVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AadhaarVerification")
            .field("number", &mask_aadhaar(&self.number))
            .field("otp", &if self.otp.is_empty() { "" } else { "******" })
            .field("otp_sent", &self.otp_sent)
            .field("otp_verified", &self.otp_verified)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacialVerification {
    pub verified: bool,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadEntry {
    pub step: String,
    pub value: Value,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only log of per-step results collected for submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionPayload {
    entries: Vec<PayloadEntry>,
}

impl SubmissionPayload {
    pub fn record(&mut self, step: impl Into<String>, value: Value) {
        self.entries.push(PayloadEntry {
            step: step.into(),
            value,
            recorded_at: Utc::now(),
        });
    }

    /// Most recent value recorded for `step`.
    pub fn latest(&self, step: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.step == step)
            .map(|entry| &entry.value)
    }

    pub fn entries(&self) -> &[PayloadEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One applicant's onboarding attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub current_step_index: usize,
    #[serde(default)]
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub document_capture: Option<CaptureResult>,
    #[serde(default)]
    pub aadhaar_verification: AadhaarVerification,
    #[serde(default)]
    pub facial_verification: FacialVerification,
    #[serde(default)]
    pub duplicate_check: Option<DuplicateCheck>,
    #[serde(default)]
    pub submission_payload: SubmissionPayload,
    /// Reference returned by a successful submission
    #[serde(default)]
    pub submission_reference: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::now_v7().to_string())
    }

    pub fn with_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            current_step_index: 0,
            personal_info: PersonalInfo::default(),
            document_capture: None,
            aadhaar_verification: AadhaarVerification::default(),
            facial_verification: FacialVerification::default(),
            duplicate_check: None,
            submission_payload: SubmissionPayload::default(),
            submission_reference: None,
        }
    }

    /// Drop every collected field and return to the first step. The session
    /// id is kept.
    pub fn clear(&mut self) {
        *self = Self::with_id(std::mem::take(&mut self.session_id));
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
