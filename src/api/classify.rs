//! Mapping of transport failures, HTTP statuses and server messages onto
//! [`ErrorKind`].
//!
//! Classification is total: every input yields exactly one kind, and the
//! message attached to the error is the user-facing one, never the raw
//! transport text.

use crate::error::{ErrorKind, RecoverableError};
use crate::util::Scrubber;

use super::{BreakerOpen, Operation, TransportError};

pub const NETWORK_MESSAGE: &str =
    "Network error. Please check your internet connection and try again.";
pub const AUTH_MESSAGE: &str = "Authentication failed. Please log in again.";
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";
pub const SERVER_MESSAGE: &str = "Server error. Please try again later.";
pub const BREAKER_MESSAGE: &str = "Circuit breaker is OPEN. Service temporarily unavailable.";
pub const UNKNOWN_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Kind for an unsuccessful HTTP status.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        401 => ErrorKind::AuthError,
        429 => ErrorKind::RateLimitError,
        500..=599 => ErrorKind::ServerError,
        _ => ErrorKind::RequestError,
    }
}

/// Kind for a free-text failure, using domain keywords.
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("document") {
        ErrorKind::DocumentScanError
    } else if lower.contains("facial") || lower.contains("face") {
        ErrorKind::FacialRecognitionError
    } else if lower.contains("aadhaar") || lower.contains("otp") {
        ErrorKind::AadhaarOtpError
    } else {
        ErrorKind::UnknownError
    }
}

/// Error for a request that never produced an HTTP response.
pub fn transport_failure(operation: Operation, err: &TransportError) -> RecoverableError {
    tracing::debug!(
        operation = %operation,
        error = %Scrubber::global().scrub(&err.to_string()),
        "Transport failure"
    );
    match err {
        TransportError::Connect(_) | TransportError::Timeout => {
            RecoverableError::new(ErrorKind::NetworkError, NETWORK_MESSAGE)
        }
    }
    .with_operation(operation)
}

/// Error for a non-2xx response.
pub fn status_failure(
    operation: Operation,
    status: u16,
    server_message: Option<&str>,
) -> RecoverableError {
    if let Some(message) = server_message {
        tracing::debug!(
            operation = %operation,
            status,
            message = %Scrubber::global().scrub(message),
            "Server rejected request"
        );
    }
    let kind = classify_status(status);
    let message = match kind {
        ErrorKind::AuthError => AUTH_MESSAGE.to_string(),
        ErrorKind::RateLimitError => RATE_LIMIT_MESSAGE.to_string(),
        ErrorKind::ServerError => SERVER_MESSAGE.to_string(),
        _ => format!("Request failed with status {status}. Please try again."),
    };
    RecoverableError::new(kind, message).with_operation(operation)
}

/// Error for a 2xx envelope carrying `success: false`.
pub fn rejection(operation: Operation, message: Option<&str>) -> RecoverableError {
    let message = message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(UNKNOWN_MESSAGE);
    RecoverableError::new(classify_message(message), message).with_operation(operation)
}

/// Error for a 2xx response whose payload does not decode.
pub fn malformed(operation: Operation, detail: &str) -> RecoverableError {
    tracing::warn!(operation = %operation, detail = %detail, "Malformed response payload");
    RecoverableError::new(
        ErrorKind::UnknownError,
        "Received an unexpected response from the server. Please try again.",
    )
    .with_operation(operation)
}

pub fn breaker_open(operation: Operation, open: &BreakerOpen) -> RecoverableError {
    tracing::debug!(
        operation = %operation,
        retry_after_ms = open.retry_after.as_millis() as u64,
        "Call rejected by open circuit breaker"
    );
    RecoverableError::new(ErrorKind::BreakerOpen, BREAKER_MESSAGE).with_operation(operation)
}
