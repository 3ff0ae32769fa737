use async_trait::async_trait;

use crate::api::{classify, ApiClient, Operation};
use crate::error::RecoverableError;
use crate::session::Snapshot;

use super::RemoteProgressStore;

#[async_trait]
impl RemoteProgressStore for ApiClient {
    async fn save(&self, snapshot: &Snapshot) -> Result<(), RecoverableError> {
        let data = snapshot
            .to_progress_data()
            .map_err(|e| classify::malformed(Operation::SaveProgress, &e.to_string()))?;
        self.save_progress(data).await
    }

    async fn fetch(&self, session_id: &str) -> Result<Option<Snapshot>, RecoverableError> {
        let progress = self.fetch_progress().await?;
        Snapshot::from_progress(&progress, session_id)
            .map_err(|e| classify::malformed(Operation::FetchProgress, &e.to_string()))
    }
}
