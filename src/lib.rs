pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod onboarding;
pub mod persistence;
pub mod recovery;
pub mod session;
pub mod util;
pub mod verification;
pub mod workflow;

pub use api::{ApiClient, BreakerConfig, CircuitBreaker, CircuitState, Operation, RetryPolicy};
pub use config::Config;
pub use data::{Database, ProfileStore, TabStore};
pub use error::{ErrorKind, OnboardingError, RecoverableError};
pub use onboarding::{LoginOutcome, Onboarding, Services};
pub use persistence::{PersistTier, ProgressManager, RecoveryReport};
pub use recovery::{RecoveryAction, RecoveryCoordinator, RecoveryPlan, Resolution};
pub use session::{CaptureResult, PersonalInfo, Session, Snapshot};
pub use workflow::{StepKind, StepWorkflow, ValidationError};
