//! Client-side input checks. Everything here runs before any network call.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::session::PersonalInfo;

// Digit classes are spelled `[0-9]`: `\d` in `regex` also matches
// Devanagari and other Unicode digits.
static PHONE: OnceLock<Option<Regex>> = OnceLock::new();
static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
static AADHAAR: OnceLock<Option<Regex>> = OnceLock::new();
static OTP: OnceLock<Option<Regex>> = OnceLock::new();

fn matches(cell: &OnceLock<Option<Regex>>, pattern: &str, input: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(input))
}

pub fn is_valid_phone(phone: &str) -> bool {
    matches(&PHONE, r"^[0-9]{10}$", phone)
}

pub fn is_valid_email(email: &str) -> bool {
    matches(&EMAIL, r"^[^\s@]+@[^\s@]+\.[^\s@]+$", email)
}

pub fn is_valid_aadhaar(number: &str) -> bool {
    matches(&AADHAAR, r"^[0-9]{12}$", number)
}

pub fn is_valid_otp(otp: &str) -> bool {
    matches(&OTP, r"^[0-9]{6}$", otp)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PersonalField {
    FullName,
    DateOfBirth,
    Address,
    PhoneNumber,
    Email,
}

impl PersonalField {
    pub fn label(&self) -> &'static str {
        match self {
            PersonalField::FullName => "Full name",
            PersonalField::DateOfBirth => "Date of birth",
            PersonalField::Address => "Address",
            PersonalField::PhoneNumber => "Phone number",
            PersonalField::Email => "Email",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    Missing(PersonalField),
    InvalidPhone,
    InvalidEmail,
}

impl FieldError {
    pub fn field(&self) -> PersonalField {
        match self {
            FieldError::Missing(field) => *field,
            FieldError::InvalidPhone => PersonalField::PhoneNumber,
            FieldError::InvalidEmail => PersonalField::Email,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Missing(field) => write!(f, "{} is required", field.label()),
            FieldError::InvalidPhone => f.write_str("Phone number must be 10 digits"),
            FieldError::InvalidEmail => f.write_str("Invalid email format"),
        }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Input rejected before it could change the session or reach the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{}", join_field_errors(.0))]
    PersonalInfo(Vec<FieldError>),
    #[error("Please scan your PAN card before continuing")]
    DocumentMissing,
    #[error("Please verify the OTP sent to your Aadhaar-linked mobile number")]
    OtpNotVerified,
    #[error("Face verification is required before continuing")]
    FaceNotVerified,
    #[error("Please enter a valid 12-digit Aadhaar number")]
    InvalidAadhaarNumber,
    #[error("Please enter a valid 6-digit OTP")]
    InvalidOtp,
    #[error("Please request an OTP before verifying")]
    OtpNotSent,
    #[error("Consent is required to submit your KYC application")]
    ConsentRequired,
    #[error("Applications can only be submitted from the Final Review step")]
    NotOnReviewStep,
    #[error("An application with these details already exists")]
    DuplicateApplicant,
    #[error("Step {0} does not exist")]
    UnknownStep(usize),
    #[error("Cannot jump ahead from step {from} to step {to}")]
    ForwardJump { from: usize, to: usize },
}

impl ValidationError {
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ValidationError::PersonalInfo(errors) => errors,
            _ => &[],
        }
    }
}

/// Check every personal field, reporting all problems at once.
pub fn validate_personal_info(info: &PersonalInfo) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    if info.full_name.trim().is_empty() {
        errors.push(FieldError::Missing(PersonalField::FullName));
    }
    if info.date_of_birth.trim().is_empty() {
        errors.push(FieldError::Missing(PersonalField::DateOfBirth));
    }
    if info.address.trim().is_empty() {
        errors.push(FieldError::Missing(PersonalField::Address));
    }

    // Formats are checked on the stored value, which is what gets submitted
    if info.phone_number.trim().is_empty() {
        errors.push(FieldError::Missing(PersonalField::PhoneNumber));
    } else if !is_valid_phone(&info.phone_number) {
        errors.push(FieldError::InvalidPhone);
    }

    if info.email.trim().is_empty() {
        errors.push(FieldError::Missing(PersonalField::Email));
    } else if !is_valid_email(&info.email) {
        errors.push(FieldError::InvalidEmail);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::PersonalInfo(errors))
    }
}
