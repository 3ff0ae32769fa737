use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ErrorKind, RecoverableError};

use super::classify;
use super::types::{
    DashboardData, DocumentScanRequest, DocumentScanResponse, DuplicateCheckRequest,
    DuplicateCheckResponse, Envelope, FaceVerifyRequest, FaceVerifyResponse, LoginRequest,
    LoginResponse, ProgressResponse, SaveProgressRequest, SendOtpRequest, SubmitRequest,
    SubmitResponse, VerifyOtpRequest,
};
use super::{
    retry_with_backoff, BreakerSnapshot, CircuitBreaker, HttpRequest, Operation, ReqwestTransport,
    RetryPolicy, Transport, TransportError,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the KYC backend.
///
/// Owns the bearer token and the retry policy, and shares a
/// [`CircuitBreaker`] with anyone else holding the same `Arc`.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    request_timeout: Duration,
    token: RwLock<Option<String>>,
    cancel: Mutex<CancellationToken>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            transport,
            retry,
            breaker,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            token: RwLock::new(None),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Build a client talking HTTP to the configured backend.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config.api.base_url, config.api.request_timeout)?;
        Ok(Self::new(
            Arc::new(transport),
            config.retry,
            Arc::new(CircuitBreaker::new(config.breaker)),
        )
        .with_request_timeout(config.api.request_timeout))
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    pub fn clear_token(&self) {
        *self.token.write() = None;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Abort every backoff wait currently in progress.
    ///
    /// Calls already waiting return their last error; later calls get a
    /// fresh token and are unaffected.
    pub fn cancel_pending(&self) {
        let mut cancel = self.cancel.lock();
        cancel.cancel();
        *cancel = CancellationToken::new();
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, RecoverableError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self.call(Operation::Login, Some(&request)).await?;
        self.set_token(response.token.clone());
        tracing::info!(username = %username, "Logged in");
        Ok(response)
    }

    pub async fn save_progress(&self, progress_data: Value) -> Result<(), RecoverableError> {
        let request = SaveProgressRequest { progress_data };
        let _: Value = self.call(Operation::SaveProgress, Some(&request)).await?;
        Ok(())
    }

    pub async fn fetch_progress(&self) -> Result<ProgressResponse, RecoverableError> {
        self.call::<(), _>(Operation::FetchProgress, None).await
    }

    pub async fn scan_document(
        &self,
        request: &DocumentScanRequest,
    ) -> Result<DocumentScanResponse, RecoverableError> {
        self.call(Operation::ScanDocument, Some(request)).await
    }

    pub async fn verify_face(
        &self,
        request: &FaceVerifyRequest,
    ) -> Result<FaceVerifyResponse, RecoverableError> {
        self.call(Operation::VerifyFace, Some(request)).await
    }

    pub async fn check_duplicate(
        &self,
        request: &DuplicateCheckRequest,
    ) -> Result<DuplicateCheckResponse, RecoverableError> {
        self.call(Operation::CheckDuplicate, Some(request)).await
    }

    pub async fn send_otp(&self, aadhaar_number: &str) -> Result<(), RecoverableError> {
        let request = SendOtpRequest {
            aadhaar_number: aadhaar_number.to_string(),
        };
        let _: Value = self.call(Operation::SendOtp, Some(&request)).await?;
        Ok(())
    }

    pub async fn verify_otp(&self, aadhaar_number: &str, otp: &str) -> Result<(), RecoverableError> {
        let request = VerifyOtpRequest {
            aadhaar_number: aadhaar_number.to_string(),
            otp: otp.to_string(),
        };
        let _: Value = self.call(Operation::VerifyOtp, Some(&request)).await?;
        Ok(())
    }

    pub async fn submit_kyc(
        &self,
        request: &SubmitRequest,
    ) -> Result<SubmitResponse, RecoverableError> {
        self.call(Operation::SubmitKyc, Some(request)).await
    }

    pub async fn fetch_dashboard(&self) -> Result<DashboardData, RecoverableError> {
        self.call::<(), _>(Operation::FetchDashboard, None).await
    }

    /// Run one logical call: breaker admission, retried attempts, then
    /// envelope and payload decoding.
    async fn call<B, T>(&self, operation: Operation, body: Option<&B>) -> Result<T, RecoverableError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body
            .map(|b| serde_json::to_value(b))
            .transpose()
            .map_err(|e| {
                RecoverableError::new(ErrorKind::RequestError, format!("Invalid request: {e}"))
                    .with_operation(operation)
            })?;

        // One key per logical call, repeated on every retry
        let idempotency_key = operation
            .requires_idempotency_key()
            .then(|| Uuid::new_v4().to_string());
        let cancel = self.cancel.lock().clone();

        let permit = if operation.uses_breaker() {
            Some(
                self.breaker
                    .try_acquire()
                    .map_err(|open| classify::breaker_open(operation, &open))?,
            )
        } else {
            None
        };

        tracing::debug!(operation = %operation, "Calling backend");

        let outcome = retry_with_backoff(&self.retry, &cancel, operation, |_| {
            let request = HttpRequest {
                method: operation.method(),
                path: operation.path(),
                body: body.clone(),
                bearer_token: self.token(),
                idempotency_key: idempotency_key.clone(),
            };
            self.attempt(operation, request)
        })
        .await;

        let (envelope, payload) = match outcome {
            Ok(parts) => {
                if let Some(permit) = permit {
                    permit.succeed();
                }
                parts
            }
            Err(err) => {
                if let Some(permit) = permit {
                    permit.fail();
                }
                tracing::warn!(operation = %operation, kind = %err.kind, "Backend call failed");
                return Err(err);
            }
        };

        if !envelope.success {
            let err = classify::rejection(operation, envelope.message.as_deref());
            tracing::info!(operation = %operation, kind = %err.kind, "Backend rejected request");
            return Err(err);
        }

        serde_json::from_value(payload).map_err(|e| classify::malformed(operation, &e.to_string()))
    }

    async fn attempt(
        &self,
        operation: Operation,
        request: HttpRequest,
    ) -> Result<(Envelope, Value), RecoverableError> {
        let response = tokio::time::timeout(self.request_timeout, self.transport.send(request))
            .await
            .unwrap_or(Err(TransportError::Timeout))
            .map_err(|e| classify::transport_failure(operation, &e))?;

        let status = response.status;
        let success = response.is_success();
        let (envelope, payload) = Envelope::split(response.body);

        if !success {
            return Err(classify::status_failure(
                operation,
                status,
                envelope.message.as_deref(),
            ));
        }

        Ok((envelope, payload))
    }
}
