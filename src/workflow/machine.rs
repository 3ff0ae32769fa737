use chrono::Utc;
use serde_json::{json, Value};

use crate::api::types::{SubmitRequest, SubmitResponse};
use crate::session::{
    CaptureResult, DuplicateCheck, FacialVerification, PersonalInfo, Session,
};

use super::otp::{self, OtpPhase};
use super::steps::{
    self, StepKind, StepSpec, AADHAAR_KEY, DOCUMENT_KEY, DUPLICATE_KEY, FACE_KEY,
    PERSONAL_INFO_KEY, STEPS, STEP_COUNT,
};
use super::transition::{TransitionEvent, TransitionPhase};
use super::validation::ValidationError;

/// Result of a navigation request that was not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMove {
    Moved { from: usize, to: usize },
    Stayed,
}

impl StepMove {
    pub fn moved(&self) -> bool {
        matches!(self, StepMove::Moved { .. })
    }
}

/// Sequential step machine over one [`Session`].
#[derive(Debug, Clone)]
pub struct StepWorkflow {
    session: Session,
    transition: TransitionPhase,
}

impl StepWorkflow {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            transition: TransitionPhase::Idle,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current_index(&self) -> usize {
        self.session.current_step_index
    }

    pub fn current_step(&self) -> &'static StepSpec {
        // Index is clamped on every write
        &STEPS[self.session.current_step_index.min(STEP_COUNT - 1)]
    }

    pub fn current_kind(&self) -> StepKind {
        self.current_step().definition.kind
    }

    pub fn transition(&self) -> TransitionPhase {
        self.transition
    }

    pub fn otp_phase(&self) -> OtpPhase {
        OtpPhase::of(&self.session.aadhaar_verification)
    }

    /// Whether the current step's gate holds.
    pub fn check_gate(&self) -> Result<(), ValidationError> {
        (self.current_step().gate)(&self.session)
    }

    /// Move one step forward if the current step's gate holds. A no-op on
    /// the last step.
    pub fn advance(&mut self) -> Result<StepMove, ValidationError> {
        let from = self.current_index();
        if from + 1 >= STEP_COUNT {
            return Ok(StepMove::Stayed);
        }
        self.check_gate()?;
        (self.current_step().on_exit)(&mut self.session);
        Ok(self.move_to(from + 1))
    }

    pub fn retreat(&mut self) -> StepMove {
        let from = self.current_index();
        if from == 0 {
            return StepMove::Stayed;
        }
        self.move_to(from - 1)
    }

    /// Jump back to an earlier (or the current) step without any gate.
    pub fn jump_to(&mut self, index: usize) -> Result<StepMove, ValidationError> {
        let from = self.current_index();
        if index >= STEP_COUNT {
            return Err(ValidationError::UnknownStep(index));
        }
        if index > from {
            return Err(ValidationError::ForwardJump { from, to: index });
        }
        if index == from {
            return Ok(StepMove::Stayed);
        }
        Ok(self.move_to(index))
    }

    fn move_to(&mut self, to: usize) -> StepMove {
        let from = self.current_index();
        self.session.current_step_index = to;
        if let Some(spec) = steps::step(to) {
            (spec.on_enter)(&mut self.session);
        }
        self.transition = TransitionPhase::begin(from, to);
        tracing::debug!(from, to, "Step changed");
        StepMove::Moved { from, to }
    }

    pub fn on_transition_event(&mut self, event: TransitionEvent) {
        self.transition = self.transition.on_event(event);
    }

    pub fn update_personal_info(&mut self, info: PersonalInfo) {
        self.session.personal_info = info;
    }

    /// Set the Aadhaar number. A different number invalidates any OTP
    /// already sent or verified for the previous one.
    pub fn set_aadhaar_number(&mut self, number: &str) {
        let number = number.trim();
        let aadhaar = &mut self.session.aadhaar_verification;
        if aadhaar.number != number {
            aadhaar.number = number.to_string();
            aadhaar.otp.clear();
            aadhaar.otp_sent = false;
            aadhaar.otp_verified = false;
        }
    }

    pub fn set_otp(&mut self, otp: &str) {
        self.session.aadhaar_verification.otp = otp.trim().to_string();
    }

    pub fn check_send_otp(&self) -> Result<(), ValidationError> {
        otp::check_send(&self.session.aadhaar_verification)
    }

    pub fn check_verify_otp(&self) -> Result<(), ValidationError> {
        otp::check_verify(&self.session.aadhaar_verification)
    }

    pub fn record_otp_sent(&mut self) {
        let aadhaar = &mut self.session.aadhaar_verification;
        aadhaar.otp_sent = true;
        aadhaar.otp_verified = false;
    }

    pub fn record_otp_verified(&mut self) {
        let aadhaar = &mut self.session.aadhaar_verification;
        aadhaar.otp_verified = true;
        aadhaar.otp.clear();
    }

    pub fn record_document(&mut self, capture: CaptureResult) {
        self.session
            .submission_payload
            .record(DOCUMENT_KEY, serde_json::to_value(&capture).unwrap_or_default());
        self.session.document_capture = Some(capture);
    }

    pub fn record_face(&mut self, capture: &CaptureResult, verified: bool) {
        self.session.facial_verification = FacialVerification {
            verified,
            confidence: capture.score,
        };
        self.session.submission_payload.record(
            FACE_KEY,
            json!({
                "verified": verified,
                "confidence": capture.score,
                "evidence": capture.evidence,
            }),
        );
    }

    pub fn record_duplicate_check(&mut self, is_duplicate: bool, message: Option<String>) {
        let check = DuplicateCheck {
            is_duplicate,
            message,
            checked_at: Utc::now(),
        };
        self.session
            .submission_payload
            .record(DUPLICATE_KEY, serde_json::to_value(&check).unwrap_or_default());
        self.session.duplicate_check = Some(check);
    }

    /// Package the session for submission.
    ///
    /// Consent is checked before anything else. Every earlier gate must
    /// still hold, and a recorded duplicate hit blocks the submission.
    pub fn prepare_submission(&self, consent: bool) -> Result<SubmitRequest, ValidationError> {
        if !consent {
            return Err(ValidationError::ConsentRequired);
        }
        if self.current_kind() != StepKind::FinalReview {
            return Err(ValidationError::NotOnReviewStep);
        }
        for spec in &STEPS[..self.current_index()] {
            (spec.gate)(&self.session)?;
        }
        if self.session.duplicate_check.as_ref().is_some_and(|d| d.is_duplicate) {
            return Err(ValidationError::DuplicateApplicant);
        }

        let payload = &self.session.submission_payload;
        let session = &self.session;
        let latest_or = |key: &str, fallback: Value| payload.latest(key).cloned().unwrap_or(fallback);

        Ok(SubmitRequest {
            personal_info: latest_or(
                PERSONAL_INFO_KEY,
                serde_json::to_value(&session.personal_info).unwrap_or_default(),
            ),
            document_data: latest_or(
                DOCUMENT_KEY,
                serde_json::to_value(&session.document_capture).unwrap_or_default(),
            ),
            aadhaar_data: latest_or(
                AADHAAR_KEY,
                json!({
                    "aadhaarNumber": session.aadhaar_verification.number,
                    "otpVerified": session.aadhaar_verification.otp_verified,
                }),
            ),
            facial_data: latest_or(
                FACE_KEY,
                serde_json::to_value(&session.facial_verification).unwrap_or_default(),
            ),
            duplicate_check: payload.latest(DUPLICATE_KEY).cloned(),
            consent,
        })
    }

    /// Record an accepted submission and move to Completion.
    pub fn complete_submission(&mut self, response: &SubmitResponse) -> StepMove {
        self.session.submission_reference = response.user_id.clone();
        self.move_to(steps::index_of(StepKind::Completion))
    }

    /// Clear the session and return to the first step.
    pub fn reset(&mut self) {
        self.session.clear();
        self.transition = TransitionPhase::Idle;
    }

    /// Replace the session with a restored one, keeping this login's
    /// session id.
    pub fn hydrate(&mut self, mut restored: Session) {
        restored.session_id = self.session.session_id.clone();
        restored.current_step_index = restored.current_step_index.min(STEP_COUNT - 1);
        self.session = restored;
        self.transition = TransitionPhase::Idle;
    }
}
