//! Error taxonomy shared by every layer of the onboarding client.
//!
//! Failures that reach the user are always expressed as a [`RecoverableError`]
//! carrying exactly one [`ErrorKind`]. The recovery coordinator routes on the
//! kind; the message is already safe to display.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::Operation;
use crate::workflow::ValidationError;

/// Closed set of failure classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NetworkError,
    AuthError,
    RateLimitError,
    ServerError,
    RequestError,
    DocumentScanError,
    FacialRecognitionError,
    AadhaarOtpError,
    PersistenceExhausted,
    BreakerOpen,
    UnknownError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 11] = [
        ErrorKind::NetworkError,
        ErrorKind::AuthError,
        ErrorKind::RateLimitError,
        ErrorKind::ServerError,
        ErrorKind::RequestError,
        ErrorKind::DocumentScanError,
        ErrorKind::FacialRecognitionError,
        ErrorKind::AadhaarOtpError,
        ErrorKind::PersistenceExhausted,
        ErrorKind::BreakerOpen,
        ErrorKind::UnknownError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::AuthError => "AUTH_ERROR",
            ErrorKind::RateLimitError => "RATE_LIMIT_ERROR",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::RequestError => "REQUEST_ERROR",
            ErrorKind::DocumentScanError => "DOCUMENT_SCAN_ERROR",
            ErrorKind::FacialRecognitionError => "FACIAL_RECOGNITION_ERROR",
            ErrorKind::AadhaarOtpError => "AADHAAR_OTP_ERROR",
            ErrorKind::PersistenceExhausted => "PERSISTENCE_EXHAUSTED",
            ErrorKind::BreakerOpen => "BREAKER_OPEN",
            ErrorKind::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Whether the generic retry wrapper may try again after this failure.
    ///
    /// Auth failures need new credentials and an open breaker must not be
    /// hammered, so both surface immediately.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ErrorKind::AuthError | ErrorKind::BreakerOpen | ErrorKind::PersistenceExhausted
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure, created at the failure site and consumed by the
/// recovery coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct RecoverableError {
    pub kind: ErrorKind,
    pub message: String,
    /// Operation that raised the error, used to replay it on retry
    pub operation: Option<Operation>,
}

impl RecoverableError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: None,
        }
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Top-level error for onboarding operations.
#[derive(Debug, Error)]
pub enum OnboardingError {
    /// Input rejected client-side before any side effect.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Classified failure from the gateway, a verification service or the
    /// persistence chain.
    #[error(transparent)]
    Recoverable(#[from] RecoverableError),

    #[error("Not logged in")]
    NotLoggedIn,
}

impl OnboardingError {
    pub fn as_recoverable(&self) -> Option<&RecoverableError> {
        match self {
            OnboardingError::Recoverable(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            OnboardingError::Validation(err) => Some(err),
            _ => None,
        }
    }
}
