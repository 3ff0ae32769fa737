//! One applicant's onboarding flow.
//!
//! [`Onboarding`] owns the step workflow for the logged-in user and runs each
//! capture or verification through the configured services. Every state
//! change is persisted; every classified failure becomes the active error of
//! the recovery coordinator, which drives the chosen recovery action back
//! through this type.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::types::{DashboardData, SubmitResponse};
use crate::api::{ApiClient, BreakerSnapshot, Operation, TransportError};
use crate::config::Config;
use crate::data::{Database, ProfileStore, TabStore};
use crate::error::{ErrorKind, OnboardingError, RecoverableError};
use crate::persistence::{PersistReceipt, ProgressManager, RecoveryReport};
use crate::recovery::{
    RecoveryAction, RecoveryCoordinator, RecoveryError, RecoveryPlan, RecoveryTarget,
    Resolution, RetryCanceller,
};
use crate::session::{CaptureResult, PersonalInfo, Session};
use crate::verification::{
    check_document_quality, DocumentAnalyzer, DuplicateChecker, DuplicateVerdict, EvidenceImage,
    FaceMatch, FaceMatcher, RemoteVerifier, FACE_MISMATCH_MESSAGE,
};
use crate::workflow::{StepMove, StepWorkflow, TransitionEvent};

const NOTHING_TO_RESTORE: &str = "No saved progress was found to restore.";

/// The three verification strategies used by the flow.
#[derive(Clone)]
pub struct Services {
    pub documents: Arc<dyn DocumentAnalyzer>,
    pub faces: Arc<dyn FaceMatcher>,
    pub duplicates: Arc<dyn DuplicateChecker>,
}

impl Services {
    /// Every strategy backed by the gateway.
    pub fn remote(client: Arc<ApiClient>) -> Self {
        let verifier = Arc::new(RemoteVerifier::new(client));
        Self {
            documents: verifier.clone(),
            faces: verifier.clone(),
            duplicates: verifier,
        }
    }

    /// One object providing all three strategies.
    pub fn from_single<V>(verifier: Arc<V>) -> Self
    where
        V: DocumentAnalyzer + FaceMatcher + DuplicateChecker + 'static,
    {
        Self {
            documents: verifier.clone(),
            faces: verifier.clone(),
            duplicates: verifier,
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: Value,
    pub recovery: RecoveryReport,
    /// Whether a previous attempt was restored
    pub resumed: bool,
}

/// Inputs of the last capture or verification, kept so it can be replayed.
#[derive(Debug, Clone)]
enum Attempt {
    Document {
        document_type: String,
        image: EvidenceImage,
    },
    Face {
        image: EvidenceImage,
    },
    Duplicates {
        biometric: Option<EvidenceImage>,
    },
    SendOtp,
    VerifyOtp,
    Submit {
        consent: bool,
    },
    Dashboard,
}

impl Attempt {
    fn operation(&self) -> Operation {
        match self {
            Attempt::Document { .. } => Operation::ScanDocument,
            Attempt::Face { .. } => Operation::VerifyFace,
            Attempt::Duplicates { .. } => Operation::CheckDuplicate,
            Attempt::SendOtp => Operation::SendOtp,
            Attempt::VerifyOtp => Operation::VerifyOtp,
            Attempt::Submit { .. } => Operation::SubmitKyc,
            Attempt::Dashboard => Operation::FetchDashboard,
        }
    }
}

pub struct Onboarding {
    client: Arc<ApiClient>,
    services: Services,
    progress: ProgressManager,
    workflow: StepWorkflow,
    recovery: RecoveryCoordinator,
    min_quality_score: u8,
    logged_in: bool,
    last_attempt: Option<Attempt>,
}

impl Onboarding {
    pub fn new(
        client: Arc<ApiClient>,
        services: Services,
        progress: ProgressManager,
        config: &Config,
    ) -> Self {
        Self {
            client,
            services,
            progress,
            workflow: StepWorkflow::new(Session::new()),
            recovery: RecoveryCoordinator::new(config.recovery.rate_limit_wait),
            min_quality_score: config.document.min_quality_score,
            logged_in: false,
            last_attempt: None,
        }
    }

    /// Wire the gateway, remote verification and both local stores from
    /// `config`.
    pub fn connect(config: &Config, database: &Database) -> Result<Self, TransportError> {
        let client = Arc::new(ApiClient::from_config(config)?);
        let progress = ProgressManager::new(
            client.clone(),
            Arc::new(ProfileStore::new(database.connection())),
            Arc::new(TabStore::new()),
        );
        let services = Services::remote(client.clone());
        Ok(Self::new(client, services, progress, config))
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn workflow(&self) -> &StepWorkflow {
        &self.workflow
    }

    pub fn session(&self) -> &Session {
        self.workflow.session()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Whether remote saves are switched off.
    pub fn is_degraded(&self) -> bool {
        self.progress.is_offline()
    }

    pub fn active_error(&self) -> Option<&RecoveryPlan> {
        self.recovery.active()
    }

    pub fn dismiss_error(&mut self) -> Option<RecoveryPlan> {
        self.recovery.dismiss()
    }

    pub fn retry_canceller(&self) -> RetryCanceller {
        self.recovery.canceller()
    }

    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.client.breaker_snapshot()
    }

    /// Log in, reconcile saved progress and resume from the newest snapshot.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, OnboardingError> {
        let response = self.client.login(username, password).await;
        let response = self.surface(response.map_err(OnboardingError::from))?;

        self.logged_in = true;
        self.progress.set_offline(false);
        self.recovery.dismiss();
        self.last_attempt = None;
        self.workflow = StepWorkflow::new(Session::new());

        let recovery = self.progress.recover(&self.session().session_id).await;
        let resumed = match &recovery.snapshot {
            Some(snapshot) => {
                self.workflow.hydrate(snapshot.session.clone());
                true
            }
            None => false,
        };
        tracing::info!(
            step = self.workflow.current_index(),
            resumed,
            remote_reachable = recovery.remote_reachable,
            "Session started"
        );

        Ok(LoginOutcome {
            user: response.user,
            recovery,
            resumed,
        })
    }

    /// End the session and forget every local copy of it.
    pub fn logout(&mut self) {
        self.client.cancel_pending();
        self.recovery.canceller().cancel();
        self.recovery.dismiss();
        self.progress.clear();
        self.progress.set_offline(false);
        self.client.clear_token();
        self.workflow.reset();
        self.logged_in = false;
        self.last_attempt = None;
        tracing::info!("Logged out");
    }

    pub async fn advance(&mut self) -> Result<StepMove, OnboardingError> {
        self.ensure_logged_in()?;
        let moved = self.workflow.advance()?;
        if moved.moved() {
            self.checkpoint().await;
        }
        Ok(moved)
    }

    pub async fn retreat(&mut self) -> Result<StepMove, OnboardingError> {
        self.ensure_logged_in()?;
        let moved = self.workflow.retreat();
        if moved.moved() {
            self.checkpoint().await;
        }
        Ok(moved)
    }

    pub async fn jump_to(&mut self, index: usize) -> Result<StepMove, OnboardingError> {
        self.ensure_logged_in()?;
        let moved = self.workflow.jump_to(index)?;
        if moved.moved() {
            self.checkpoint().await;
        }
        Ok(moved)
    }

    pub fn on_transition_event(&mut self, event: TransitionEvent) {
        self.workflow.on_transition_event(event);
    }

    pub async fn update_personal_info(&mut self, info: PersonalInfo) -> Result<(), OnboardingError> {
        self.ensure_logged_in()?;
        self.workflow.update_personal_info(info);
        self.checkpoint().await;
        Ok(())
    }

    pub async fn set_aadhaar_number(&mut self, number: &str) -> Result<(), OnboardingError> {
        self.ensure_logged_in()?;
        self.workflow.set_aadhaar_number(number);
        self.checkpoint().await;
        Ok(())
    }

    /// Store the typed OTP. It is never persisted.
    pub fn set_otp(&mut self, otp: &str) {
        self.workflow.set_otp(otp);
    }

    pub async fn scan_document(
        &mut self,
        document_type: &str,
        image: EvidenceImage,
    ) -> Result<CaptureResult, OnboardingError> {
        self.ensure_logged_in()?;
        let result = self.run_scan_document(document_type, &image).await;
        self.last_attempt = Some(Attempt::Document {
            document_type: document_type.to_string(),
            image,
        });
        self.surface(result)
    }

    pub async fn verify_face(&mut self, image: EvidenceImage) -> Result<FaceMatch, OnboardingError> {
        self.ensure_logged_in()?;
        let result = self.run_verify_face(&image).await;
        self.last_attempt = Some(Attempt::Face { image });
        self.surface(result)
    }

    pub async fn check_duplicates(
        &mut self,
        biometric: Option<EvidenceImage>,
    ) -> Result<DuplicateVerdict, OnboardingError> {
        self.ensure_logged_in()?;
        let result = self.run_check_duplicates(biometric.as_ref()).await;
        self.last_attempt = Some(Attempt::Duplicates { biometric });
        self.surface(result)
    }

    pub async fn send_otp(&mut self) -> Result<(), OnboardingError> {
        self.ensure_logged_in()?;
        let result = self.run_send_otp().await;
        self.last_attempt = Some(Attempt::SendOtp);
        self.surface(result)
    }

    pub async fn verify_otp(&mut self, otp: &str) -> Result<(), OnboardingError> {
        self.ensure_logged_in()?;
        self.workflow.set_otp(otp);
        let result = self.run_verify_otp().await;
        self.last_attempt = Some(Attempt::VerifyOtp);
        self.surface(result)
    }

    /// Submit the application from Final Review.
    ///
    /// On failure the workflow stays on Final Review.
    pub async fn submit(&mut self, consent: bool) -> Result<SubmitResponse, OnboardingError> {
        self.ensure_logged_in()?;
        let result = self.run_submit(consent).await;
        self.last_attempt = Some(Attempt::Submit { consent });
        self.surface(result)
    }

    /// Discard the finished attempt and begin a new one.
    pub async fn start_new(&mut self) -> Result<(), OnboardingError> {
        self.ensure_logged_in()?;
        self.recovery.dismiss();
        self.last_attempt = None;
        self.progress.clear();
        self.workflow.reset();
        self.checkpoint().await;
        Ok(())
    }

    pub async fn fetch_dashboard(&mut self) -> Result<DashboardData, OnboardingError> {
        self.ensure_logged_in()?;
        let result = self.client.fetch_dashboard().await.map_err(OnboardingError::from);
        self.last_attempt = Some(Attempt::Dashboard);
        self.surface(result)
    }

    /// Run a recovery action for the active error.
    pub async fn resolve(&mut self, action: RecoveryAction) -> Result<Resolution, RecoveryError> {
        let mut coordinator = std::mem::take(&mut self.recovery);
        let result = coordinator.resolve(action, self).await;

        // A save that failed while the action ran
        if let Some(raised) = self.recovery.dismiss() {
            if coordinator.active().is_none() {
                coordinator.classify_and_resolve(raised.error);
            }
        }
        self.recovery = coordinator;
        result
    }

    /// Persist the session, recording exhaustion as the active error. The
    /// session stays in memory either way.
    async fn checkpoint(&mut self) -> Option<PersistReceipt> {
        match self.progress.persist(self.workflow.session()).await {
            Ok(receipt) => Some(receipt),
            Err(err) => {
                self.recovery.classify_and_resolve(err);
                None
            }
        }
    }

    fn ensure_logged_in(&self) -> Result<(), OnboardingError> {
        if self.logged_in {
            Ok(())
        } else {
            Err(OnboardingError::NotLoggedIn)
        }
    }

    /// Hand a recoverable failure to the coordinator and pass the result on.
    fn surface<T>(&mut self, result: Result<T, OnboardingError>) -> Result<T, OnboardingError> {
        if let Err(OnboardingError::Recoverable(err)) = &result {
            self.recovery.classify_and_resolve(err.clone());
        }
        result
    }

    async fn run_scan_document(
        &mut self,
        document_type: &str,
        image: &EvidenceImage,
    ) -> Result<CaptureResult, OnboardingError> {
        let capture = self
            .services
            .documents
            .analyze(document_type, image)
            .await
            .map_err(|e| e.with_operation(Operation::ScanDocument))?;
        check_document_quality(&capture, self.min_quality_score)
            .map_err(|e| e.with_operation(Operation::ScanDocument))?;

        self.workflow.record_document(capture.clone());
        self.checkpoint().await;
        Ok(capture)
    }

    async fn run_verify_face(&mut self, image: &EvidenceImage) -> Result<FaceMatch, OnboardingError> {
        let face = self
            .services
            .faces
            .match_face(image)
            .await
            .map_err(|e| e.with_operation(Operation::VerifyFace))?;

        self.workflow.record_face(&face.capture, face.verified);
        self.checkpoint().await;

        if !face.verified {
            tracing::info!(confidence = face.capture.score, "Face did not match");
            return Err(RecoverableError::new(
                ErrorKind::FacialRecognitionError,
                FACE_MISMATCH_MESSAGE,
            )
            .with_operation(Operation::VerifyFace)
            .into());
        }
        Ok(face)
    }

    async fn run_check_duplicates(
        &mut self,
        biometric: Option<&EvidenceImage>,
    ) -> Result<DuplicateVerdict, OnboardingError> {
        let verdict = self
            .services
            .duplicates
            .check(&self.session().personal_info, biometric)
            .await
            .map_err(|e| e.with_operation(Operation::CheckDuplicate))?;

        if verdict.is_duplicate {
            tracing::warn!("Duplicate applicant detected");
        }
        self.workflow
            .record_duplicate_check(verdict.is_duplicate, verdict.message.clone());
        self.checkpoint().await;
        Ok(verdict)
    }

    async fn run_send_otp(&mut self) -> Result<(), OnboardingError> {
        self.workflow.check_send_otp()?;
        let number = self.session().aadhaar_verification.number.clone();
        self.client.send_otp(&number).await?;
        self.workflow.record_otp_sent();
        self.checkpoint().await;
        Ok(())
    }

    async fn run_verify_otp(&mut self) -> Result<(), OnboardingError> {
        self.workflow.check_verify_otp()?;
        let aadhaar = &self.session().aadhaar_verification;
        let (number, otp) = (aadhaar.number.clone(), aadhaar.otp.clone());
        self.client.verify_otp(&number, &otp).await?;
        self.workflow.record_otp_verified();
        self.checkpoint().await;
        Ok(())
    }

    async fn run_submit(&mut self, consent: bool) -> Result<SubmitResponse, OnboardingError> {
        let request = self.workflow.prepare_submission(consent)?;
        let response = self.client.submit_kyc(&request).await?;
        tracing::info!(reference = ?response.user_id, "Application submitted");
        self.workflow.complete_submission(&response);
        self.checkpoint().await;
        Ok(response)
    }

    /// Save without raising into the coordinator.
    async fn save_now(&mut self) -> Result<(), OnboardingError> {
        self.progress.persist(self.workflow.session()).await?;
        Ok(())
    }
}

#[async_trait]
impl RecoveryTarget for Onboarding {
    async fn retry_operation(&mut self, operation: Option<Operation>) -> Result<(), OnboardingError> {
        let attempt = self
            .last_attempt
            .clone()
            .filter(|a| Some(a.operation()) == operation);

        let Some(attempt) = attempt else {
            // Nothing to replay: the failure came from a save or a fetch
            return self.save_now().await;
        };
        tracing::info!(operation = %attempt.operation().as_str(), "Replaying operation");

        match attempt {
            Attempt::Document {
                document_type,
                image,
            } => self.run_scan_document(&document_type, &image).await.map(drop),
            Attempt::Face { image } => self.run_verify_face(&image).await.map(drop),
            Attempt::Duplicates { biometric } => {
                self.run_check_duplicates(biometric.as_ref()).await.map(drop)
            }
            Attempt::SendOtp => self.run_send_otp().await,
            Attempt::VerifyOtp => self.run_verify_otp().await,
            Attempt::Submit { consent } => self.run_submit(consent).await.map(drop),
            Attempt::Dashboard => self.client.fetch_dashboard().await.map(drop).map_err(Into::into),
        }
    }

    async fn continue_degraded(&mut self) -> Result<(), OnboardingError> {
        self.progress.set_offline(true);
        self.save_now().await
    }

    async fn reauthenticate(&mut self) -> Result<(), OnboardingError> {
        self.logout();
        Ok(())
    }

    async fn restore_snapshot(&mut self) -> Result<(), OnboardingError> {
        let Some(snapshot) = self.progress.last_snapshot() else {
            return Err(RecoverableError::new(ErrorKind::UnknownError, NOTHING_TO_RESTORE).into());
        };
        tracing::info!(version = snapshot.version, "Restoring last snapshot");
        self.workflow.hydrate(snapshot.session);
        Ok(())
    }
}
