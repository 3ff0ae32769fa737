//! Resilient gateway client for the KYC backend.
//!
//! Every operation goes through [`retry::retry_with_backoff`]; the critical
//! ones are additionally guarded by the shared [`CircuitBreaker`]. Failures
//! leave this module already classified as a
//! [`RecoverableError`](crate::error::RecoverableError).

mod breaker;
pub mod classify;
mod client;
pub mod mock;
mod retry;
mod transport;
pub mod types;

use serde::{Deserialize, Serialize};

pub use breaker::{BreakerConfig, BreakerOpen, BreakerPermit, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use client::ApiClient;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, TransportError};

/// One backend capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Login,
    SaveProgress,
    FetchProgress,
    ScanDocument,
    VerifyFace,
    CheckDuplicate,
    SendOtp,
    VerifyOtp,
    SubmitKyc,
    FetchDashboard,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::Login,
        Operation::SaveProgress,
        Operation::FetchProgress,
        Operation::ScanDocument,
        Operation::VerifyFace,
        Operation::CheckDuplicate,
        Operation::SendOtp,
        Operation::VerifyOtp,
        Operation::SubmitKyc,
        Operation::FetchDashboard,
    ];

    /// Endpoint path relative to the configured base URL
    pub fn path(&self) -> &'static str {
        match self {
            Operation::Login => "/auth/login",
            Operation::SaveProgress => "/kyc/save-progress",
            Operation::FetchProgress => "/kyc/progress",
            Operation::ScanDocument => "/kyc/document-scan",
            Operation::VerifyFace => "/kyc/facial-recognition",
            Operation::CheckDuplicate => "/kyc/duplicate-check",
            Operation::SendOtp => "/kyc/aadhaar/send-otp",
            Operation::VerifyOtp => "/kyc/aadhaar/verify-otp",
            Operation::SubmitKyc => "/kyc/submit",
            Operation::FetchDashboard => "/kyc/dashboard",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Operation::FetchProgress | Operation::FetchDashboard => Method::Get,
            _ => Method::Post,
        }
    }

    /// Operations guarded by the shared circuit breaker
    pub fn uses_breaker(&self) -> bool {
        matches!(
            self,
            Operation::SaveProgress
                | Operation::FetchProgress
                | Operation::ScanDocument
                | Operation::VerifyFace
                | Operation::SubmitKyc
        )
    }

    /// Operations with server-side effects that must be deduplicated across
    /// retries with a client-generated request id
    pub fn requires_idempotency_key(&self) -> bool {
        matches!(self, Operation::ScanDocument | Operation::SendOtp)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Login => "login",
            Operation::SaveProgress => "save-progress",
            Operation::FetchProgress => "fetch-progress",
            Operation::ScanDocument => "scan-document",
            Operation::VerifyFace => "verify-face",
            Operation::CheckDuplicate => "check-duplicate",
            Operation::SendOtp => "send-otp",
            Operation::VerifyOtp => "verify-otp",
            Operation::SubmitKyc => "submit-kyc",
            Operation::FetchDashboard => "fetch-dashboard",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
