//! Turns a raised error into a recovery menu and runs the chosen action.

mod coordinator;
pub mod tips;

pub use coordinator::{
    RecoveryAction, RecoveryCoordinator, RecoveryError, RecoveryPlan, RecoveryTarget,
    Resolution, RetryCanceller, SupportTicket,
};
