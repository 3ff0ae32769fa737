//! Wire types for the KYC backend.
//!
//! Every response is wrapped in `{success, message?, data?}`. Some endpoints
//! put their payload under `data`, others inline it next to `success`; the
//! [`Envelope`] hides the difference.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    /// Missing means success; some endpoints return the bare payload
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

fn default_true() -> bool {
    true
}

impl Envelope {
    /// Split a response body into the envelope fields and the payload.
    ///
    /// The payload is `data` when present, otherwise the whole body.
    pub fn split(body: Value) -> (Envelope, Value) {
        let envelope = match &body {
            Value::Object(_) => serde_json::from_value(body.clone()).unwrap_or(Envelope {
                success: true,
                message: None,
                data: None,
            }),
            Value::String(text) => Envelope {
                success: true,
                message: Some(text.clone()),
                data: None,
            },
            _ => Envelope {
                success: true,
                message: None,
                data: None,
            },
        };
        let payload = match &envelope.data {
            Some(data) if !data.is_null() => data.clone(),
            _ => body,
        };
        (envelope, payload)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    pub progress_data: Value,
}

/// Stored progress. `kyc_session` carries the versioned snapshot; the flat
/// fields are what older clients wrote.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    #[serde(default)]
    pub current_step: Option<usize>,
    #[serde(default)]
    pub personal_info: Option<Value>,
    #[serde(default)]
    pub document_data: Option<Value>,
    #[serde(default)]
    pub aadhaar_data: Option<Value>,
    #[serde(default)]
    pub facial_verified: Option<bool>,
    #[serde(default)]
    pub kyc_session: Option<Value>,
}

impl ProgressResponse {
    pub fn is_empty(&self) -> bool {
        self.current_step.is_none() && self.kyc_session.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentScanRequest {
    pub document_type: String,
    /// `data:<mime>;base64,<payload>` URL
    pub image_data: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentScanResponse {
    #[serde(default, alias = "type")]
    pub document_type: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub quality_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceVerifyRequest {
    pub image_data: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaceVerifyResponse {
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub verified: Option<bool>,
}

impl FaceVerifyResponse {
    pub const MATCH_THRESHOLD: f64 = 70.0;

    /// Explicit verdict if the server gave one, otherwise the confidence
    /// threshold.
    pub fn is_verified(&self) -> bool {
        self.verified
            .unwrap_or(self.confidence >= Self::MATCH_THRESHOLD)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckRequest {
    pub personal_info: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biometric_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckResponse {
    #[serde(default)]
    pub is_duplicate: bool,
    #[serde(default)]
    pub duplicate_info: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub aadhaar_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub aadhaar_number: String,
    pub otp: String,
}

/// Packaged application sent on final submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub personal_info: Value,
    pub document_data: Value,
    pub aadhaar_data: Value,
    pub facial_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_check: Option<Value>,
    pub consent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[serde(default, alias = "referenceNumber")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "estimatedProcessingTime")]
    pub estimated_completion: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardData {
    pub total_kyc_attempts: u64,
    pub successful_kyc: u64,
    pub failed_kyc: u64,
    pub success_rate: f64,
    pub failure_by_step: BTreeMap<String, u64>,
    pub upload_failures: u64,
    pub otp_failures: u64,
    pub face_mismatch: u64,
    pub daily_success_rates: Vec<RatePoint>,
    pub weekly_success_rates: Vec<RatePoint>,
    pub recent_attempts: Vec<RecentAttempt>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatePoint {
    #[serde(alias = "date", alias = "day", alias = "week")]
    pub label: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecentAttempt {
    pub id: Value,
    pub full_name: String,
    pub status: String,
    pub document_number: String,
    pub created_at: String,
}
