use serde::Serialize;

use crate::session::AadhaarVerification;

use super::validation::{is_valid_aadhaar, is_valid_otp, ValidationError};

/// Aadhaar OTP sub-state inside the Aadhaar OTP step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPhase {
    NotSent,
    AwaitingVerification,
    Verified,
}

impl OtpPhase {
    pub fn of(aadhaar: &AadhaarVerification) -> Self {
        if aadhaar.otp_verified {
            OtpPhase::Verified
        } else if aadhaar.otp_sent {
            OtpPhase::AwaitingVerification
        } else {
            OtpPhase::NotSent
        }
    }
}

/// Checks that must pass before asking the backend to send an OTP.
pub fn check_send(aadhaar: &AadhaarVerification) -> Result<(), ValidationError> {
    if is_valid_aadhaar(aadhaar.number.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidAadhaarNumber)
    }
}

/// Checks that must pass before asking the backend to verify an OTP.
pub fn check_verify(aadhaar: &AadhaarVerification) -> Result<(), ValidationError> {
    if OtpPhase::of(aadhaar) == OtpPhase::NotSent {
        return Err(ValidationError::OtpNotSent);
    }
    if !is_valid_otp(aadhaar.otp.trim()) {
        return Err(ValidationError::InvalidOtp);
    }
    Ok(())
}
