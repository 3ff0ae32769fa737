//! Seven-step onboarding state machine with per-step validation gates.

mod machine;
mod otp;
pub mod steps;
mod transition;
mod validation;

pub use machine::{StepMove, StepWorkflow};
pub use otp::OtpPhase;
pub use steps::{StepDefinition, StepKind, STEP_COUNT};
pub use transition::{TransitionEvent, TransitionPhase, ENTER_DURATION, EXIT_DURATION};
pub use validation::{
    is_valid_aadhaar, is_valid_email, is_valid_otp, is_valid_phone, validate_personal_info,
    FieldError, PersonalField, ValidationError,
};
