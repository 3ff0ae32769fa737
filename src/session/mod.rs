//! Applicant session state and its persisted snapshot form.

mod model;
mod snapshot;

pub use model::{
    AadhaarVerification, CaptureKind, CaptureResult, DuplicateCheck, FacialVerification,
    PayloadEntry, PersonalInfo, Session, SubmissionPayload, NOT_DETECTED,
};
pub use snapshot::{Snapshot, SnapshotError};
