//! The fixed onboarding step table.
//!
//! Each step carries a gate that must hold before leaving it forward, and
//! enter/exit hooks. Exit hooks run only when a step is left by `advance`.

use serde::Serialize;
use serde_json::json;

use crate::session::Session;

use super::validation::{validate_personal_info, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Welcome,
    PersonalInfo,
    PanUpload,
    AadhaarOtp,
    FaceMatch,
    FinalReview,
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    pub index: usize,
    pub kind: StepKind,
    pub name: &'static str,
    pub description: &'static str,
}

pub type Gate = fn(&Session) -> Result<(), ValidationError>;
pub type Hook = fn(&mut Session);

pub struct StepSpec {
    pub definition: StepDefinition,
    pub gate: Gate,
    pub on_enter: Hook,
    pub on_exit: Hook,
}

pub const STEP_COUNT: usize = 7;

/// Payload key for personal details
pub const PERSONAL_INFO_KEY: &str = "Personal Info";
/// Payload key for the scanned document
pub const DOCUMENT_KEY: &str = "PAN Upload";
/// Payload key for the Aadhaar verification result
pub const AADHAAR_KEY: &str = "Aadhaar OTP";
/// Payload key for the facial match
pub const FACE_KEY: &str = "Face Match";
/// Payload key for the duplicate check
pub const DUPLICATE_KEY: &str = "Duplicate Check";

pub static STEPS: [StepSpec; STEP_COUNT] = [
    StepSpec {
        definition: StepDefinition {
            index: 0,
            kind: StepKind::Welcome,
            name: "Welcome",
            description: "Start your KYC process",
        },
        gate: open_gate,
        on_enter: no_hook,
        on_exit: no_hook,
    },
    StepSpec {
        definition: StepDefinition {
            index: 1,
            kind: StepKind::PersonalInfo,
            name: "Personal Info",
            description: "Enter your personal details",
        },
        gate: personal_info_gate,
        on_enter: no_hook,
        on_exit: record_personal_info,
    },
    StepSpec {
        definition: StepDefinition {
            index: 2,
            kind: StepKind::PanUpload,
            name: "PAN Upload",
            description: "Upload your PAN card",
        },
        gate: document_gate,
        on_enter: no_hook,
        on_exit: no_hook,
    },
    StepSpec {
        definition: StepDefinition {
            index: 3,
            kind: StepKind::AadhaarOtp,
            name: "Aadhaar OTP",
            description: "Verify your Aadhaar number",
        },
        gate: otp_gate,
        on_enter: discard_unverified_otp,
        on_exit: record_aadhaar,
    },
    StepSpec {
        definition: StepDefinition {
            index: 4,
            kind: StepKind::FaceMatch,
            name: "Face Match",
            description: "Verify your identity with facial recognition",
        },
        gate: face_gate,
        on_enter: no_hook,
        on_exit: no_hook,
    },
    StepSpec {
        definition: StepDefinition {
            index: 5,
            kind: StepKind::FinalReview,
            name: "Final Review",
            description: "Review and submit your information",
        },
        gate: open_gate,
        on_enter: no_hook,
        on_exit: no_hook,
    },
    StepSpec {
        definition: StepDefinition {
            index: 6,
            kind: StepKind::Completion,
            name: "Completion",
            description: "KYC process completed",
        },
        gate: open_gate,
        on_enter: no_hook,
        on_exit: no_hook,
    },
];

pub fn step(index: usize) -> Option<&'static StepSpec> {
    STEPS.get(index)
}

pub fn index_of(kind: StepKind) -> usize {
    STEPS
        .iter()
        .position(|spec| spec.definition.kind == kind)
        .unwrap_or(0)
}

pub fn definitions() -> impl Iterator<Item = &'static StepDefinition> {
    STEPS.iter().map(|spec| &spec.definition)
}

fn open_gate(_: &Session) -> Result<(), ValidationError> {
    Ok(())
}

fn personal_info_gate(session: &Session) -> Result<(), ValidationError> {
    validate_personal_info(&session.personal_info)
}

fn document_gate(session: &Session) -> Result<(), ValidationError> {
    if session.document_capture.is_some() {
        Ok(())
    } else {
        Err(ValidationError::DocumentMissing)
    }
}

fn otp_gate(session: &Session) -> Result<(), ValidationError> {
    if session.aadhaar_verification.otp_verified {
        Ok(())
    } else {
        Err(ValidationError::OtpNotVerified)
    }
}

fn face_gate(session: &Session) -> Result<(), ValidationError> {
    if session.facial_verification.verified {
        Ok(())
    } else {
        Err(ValidationError::FaceNotVerified)
    }
}

fn no_hook(_: &mut Session) {}

fn record_personal_info(session: &mut Session) {
    let info = &session.personal_info;
    let value = json!({
        "fullName": info.full_name,
        "dateOfBirth": info.date_of_birth,
        "address": info.address,
        "phoneNumber": info.phone_number,
        "email": info.email,
    });
    session.submission_payload.record(PERSONAL_INFO_KEY, value);
}

fn record_aadhaar(session: &mut Session) {
    let aadhaar = &session.aadhaar_verification;
    let value = json!({
        "aadhaarNumber": aadhaar.number,
        "otpVerified": aadhaar.otp_verified,
    });
    session.submission_payload.record(AADHAAR_KEY, value);
}

// A typed but unverified OTP from an earlier visit is stale
fn discard_unverified_otp(session: &mut Session) {
    if !session.aadhaar_verification.otp_verified {
        session.aadhaar_verification.otp.clear();
    }
}
