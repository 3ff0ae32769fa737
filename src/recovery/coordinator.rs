use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::Operation;
use crate::error::{ErrorKind, OnboardingError, RecoverableError};

use super::tips;

const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    RetryNow,
    ContinueDegraded,
    Reauthenticate,
    WaitThenRetry,
    RestoreSnapshot,
    EscalateToSupport,
}

impl RecoveryAction {
    pub fn label(&self) -> &'static str {
        match self {
            RecoveryAction::RetryNow => "Try again",
            RecoveryAction::ContinueDegraded => "Continue offline",
            RecoveryAction::Reauthenticate => "Log in again",
            RecoveryAction::WaitThenRetry => "Wait and retry",
            RecoveryAction::RestoreSnapshot => "Recover previous state",
            RecoveryAction::EscalateToSupport => "Contact support",
        }
    }
}

/// What to show for an error and which actions are on offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryPlan {
    pub error: RecoverableError,
    pub message: String,
    pub tips: &'static [&'static str],
    /// Always ends with [`RecoveryAction::EscalateToSupport`]
    pub actions: Vec<RecoveryAction>,
}

impl RecoveryPlan {
    pub fn for_error(error: RecoverableError) -> Self {
        let mut actions = match error.kind {
            ErrorKind::NetworkError => vec![RecoveryAction::RetryNow, RecoveryAction::ContinueDegraded],
            ErrorKind::AuthError => vec![RecoveryAction::Reauthenticate],
            ErrorKind::RateLimitError => vec![RecoveryAction::WaitThenRetry],
            _ => vec![RecoveryAction::RetryNow, RecoveryAction::RestoreSnapshot],
        };
        actions.push(RecoveryAction::EscalateToSupport);

        let message = tips::headline(error.kind)
            .map(str::to_string)
            .unwrap_or_else(|| error.message.clone());

        Self {
            tips: tips::tips(error.kind),
            message,
            actions,
            error,
        }
    }

    pub fn offers(&self, action: RecoveryAction) -> bool {
        self.actions.contains(&action)
    }
}

/// Details handed to support on escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportTicket {
    pub reference: String,
    pub kind: ErrorKind,
    pub message: String,
    pub operation: Option<Operation>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The action ran and the error is gone
    Resolved(RecoveryAction),
    /// Support was contacted; the error stays active
    Escalated(SupportTicket),
    /// A scheduled retry was cancelled before it ran; the error is active again
    Cancelled,
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("There is no error to recover from")]
    NoActiveError,
    #[error("'{}' is not available for this error", .0.label())]
    ActionUnavailable(RecoveryAction),
    #[error("{} failed: {source}", .action.label())]
    Action {
        action: RecoveryAction,
        #[source]
        source: OnboardingError,
    },
}

/// Operations the coordinator can drive on the onboarding flow.
#[async_trait]
pub trait RecoveryTarget: Send {
    /// Re-run the operation that raised the error, or re-save progress when
    /// the operation is unknown.
    async fn retry_operation(&mut self, operation: Option<Operation>) -> Result<(), OnboardingError>;

    /// Keep working with remote saves turned off.
    async fn continue_degraded(&mut self) -> Result<(), OnboardingError>;

    /// Log out and clear the session so the user can log in again.
    async fn reauthenticate(&mut self) -> Result<(), OnboardingError>;

    /// Roll the session back to the last persisted snapshot.
    async fn restore_snapshot(&mut self) -> Result<(), OnboardingError>;
}

/// Cancels a scheduled retry from outside the coordinator.
#[derive(Debug, Clone, Default)]
pub struct RetryCanceller {
    pending: Arc<Mutex<Option<CancellationToken>>>,
}

impl RetryCanceller {
    /// Returns whether a wait was pending.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}

/// Holds the active error and runs the recovery action the user picks.
#[derive(Debug)]
pub struct RecoveryCoordinator {
    active: Option<RecoveryPlan>,
    rate_limit_wait: Duration,
    canceller: RetryCanceller,
}

impl Default for RecoveryCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_WAIT)
    }
}

impl RecoveryCoordinator {
    pub fn new(rate_limit_wait: Duration) -> Self {
        Self {
            active: None,
            rate_limit_wait,
            canceller: RetryCanceller::default(),
        }
    }

    /// Make `error` the active one and return its plan.
    pub fn classify_and_resolve(&mut self, error: RecoverableError) -> &RecoveryPlan {
        tracing::info!(
            kind = %error.kind,
            operation = ?error.operation,
            "Recoverable error raised"
        );
        self.active.insert(RecoveryPlan::for_error(error))
    }

    pub fn active(&self) -> Option<&RecoveryPlan> {
        self.active.as_ref()
    }

    pub fn dismiss(&mut self) -> Option<RecoveryPlan> {
        self.active.take()
    }

    pub fn canceller(&self) -> RetryCanceller {
        self.canceller.clone()
    }

    /// Run `action` for the active error.
    ///
    /// The active error is cleared before the action runs; if the action
    /// fails with a recoverable error, that error becomes the active one.
    pub async fn resolve<T>(
        &mut self,
        action: RecoveryAction,
        target: &mut T,
    ) -> Result<Resolution, RecoveryError>
    where
        T: RecoveryTarget + ?Sized,
    {
        let plan = self.active.as_ref().ok_or(RecoveryError::NoActiveError)?;
        if !plan.offers(action) {
            return Err(RecoveryError::ActionUnavailable(action));
        }

        if action == RecoveryAction::EscalateToSupport {
            let ticket = SupportTicket {
                reference: format!("SUP-{}", &Uuid::new_v4().simple().to_string()[..8]),
                kind: plan.error.kind,
                message: plan.error.message.clone(),
                operation: plan.error.operation,
                created_at: Utc::now(),
            };
            tracing::info!(reference = %ticket.reference, kind = %ticket.kind, "Escalated to support");
            return Ok(Resolution::Escalated(ticket));
        }

        let Some(plan) = self.active.take() else {
            return Err(RecoveryError::NoActiveError);
        };
        let operation = plan.error.operation;
        tracing::debug!(action = ?action, kind = %plan.error.kind, "Running recovery action");

        let outcome = match action {
            RecoveryAction::RetryNow => {
                self.canceller.cancel();
                target.retry_operation(operation).await
            }
            RecoveryAction::ContinueDegraded => target.continue_degraded().await,
            RecoveryAction::Reauthenticate => target.reauthenticate().await,
            RecoveryAction::RestoreSnapshot => target.restore_snapshot().await,
            RecoveryAction::WaitThenRetry => {
                if !self.wait_for_retry().await {
                    tracing::info!("Scheduled retry cancelled");
                    self.active = Some(plan);
                    return Ok(Resolution::Cancelled);
                }
                target.retry_operation(operation).await
            }
            RecoveryAction::EscalateToSupport => return Err(RecoveryError::ActionUnavailable(action)),
        };

        match outcome {
            Ok(()) => Ok(Resolution::Resolved(action)),
            Err(source) => {
                if let Some(err) = source.as_recoverable() {
                    self.classify_and_resolve(err.clone());
                }
                Err(RecoveryError::Action { action, source })
            }
        }
    }

    /// Sleep for the rate-limit wait. Returns false if cancelled.
    async fn wait_for_retry(&self) -> bool {
        let token = CancellationToken::new();
        if let Some(previous) = self.canceller.pending.lock().replace(token.clone()) {
            previous.cancel();
        }

        let completed = tokio::select! {
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(self.rate_limit_wait) => true,
        };

        let mut pending = self.canceller.pending.lock();
        if pending.as_ref().is_some_and(|p| p.is_cancelled() || completed) {
            *pending = None;
        }
        completed
    }
}
