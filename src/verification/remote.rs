use std::sync::Arc;

use async_trait::async_trait;

use crate::api::types::{DocumentScanRequest, DuplicateCheckRequest, FaceVerifyRequest};
use crate::api::ApiClient;
use crate::error::RecoverableError;
use crate::session::{CaptureResult, PersonalInfo};

use super::{
    DocumentAnalyzer, DuplicateChecker, DuplicateVerdict, EvidenceImage, FaceMatch, FaceMatcher,
};

/// Verification through the backend's OCR, face and duplicate endpoints.
#[derive(Clone)]
pub struct RemoteVerifier {
    client: Arc<ApiClient>,
}

impl RemoteVerifier {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentAnalyzer for RemoteVerifier {
    async fn analyze(
        &self,
        document_type: &str,
        image: &EvidenceImage,
    ) -> Result<CaptureResult, RecoverableError> {
        let request = DocumentScanRequest {
            document_type: document_type.to_string(),
            image_data: image.data_url(),
        };
        let scan = self.client.scan_document(&request).await?;
        Ok(CaptureResult::from_document_scan(
            document_type,
            &scan,
            Some(image.reference()),
        ))
    }
}

#[async_trait]
impl FaceMatcher for RemoteVerifier {
    async fn match_face(&self, image: &EvidenceImage) -> Result<FaceMatch, RecoverableError> {
        let request = FaceVerifyRequest {
            image_data: image.data_url(),
        };
        let response = self.client.verify_face(&request).await?;
        Ok(FaceMatch {
            verified: response.is_verified(),
            capture: CaptureResult::facial(response.confidence, Some(image.reference())),
        })
    }
}

#[async_trait]
impl DuplicateChecker for RemoteVerifier {
    async fn check(
        &self,
        personal_info: &PersonalInfo,
        biometric: Option<&EvidenceImage>,
    ) -> Result<DuplicateVerdict, RecoverableError> {
        let request = DuplicateCheckRequest {
            personal_info: serde_json::to_value(personal_info).unwrap_or_default(),
            biometric_data: biometric.map(EvidenceImage::data_url),
        };
        let response = self.client.check_duplicate(&request).await?;
        Ok(DuplicateVerdict {
            is_duplicate: response.is_duplicate,
            message: response.message,
        })
    }
}
