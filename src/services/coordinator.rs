use crate::config::UploadConfig;
use crate::models::{UploadRequest, UploadResponse};
use crate::services::completeness::{self, Completeness};
use crate::services::error::UploadError;
use crate::services::inventory::PartInventory;
use crate::services::part_store::PartStore;
use crate::services::reassembler::Reassembler;
use crate::services::staging::StagedPayload;
use crate::utils::upload_locks::UploadLocks;
use std::time::Duration;

/// Runs one upload request from stored payload to response.
pub struct UploadCoordinator {
    store: PartStore,
    inventory: PartInventory,
    reassembler: Reassembler,
    locks: UploadLocks,
    merge_timeout: Duration,
}

impl UploadCoordinator {
    pub fn new(
        store: PartStore,
        inventory: PartInventory,
        reassembler: Reassembler,
        locks: UploadLocks,
        merge_timeout: Duration,
    ) -> Self {
        Self {
            store,
            inventory,
            reassembler,
            locks,
            merge_timeout,
        }
    }

    pub fn from_config(config: &UploadConfig, locks: UploadLocks) -> Self {
        Self::new(
            PartStore::new(&config.upload_dir),
            PartInventory::new(&config.upload_dir),
            Reassembler::new(&config.upload_dir, &config.staging_dir),
            locks,
            config.merge_timeout(),
        )
    }

    /// Stores `payload` for `request` and, for multipart uploads, either merges
    /// the upload or reports which parts are still missing.
    pub async fn handle(
        &self,
        request: UploadRequest,
        payload: StagedPayload,
    ) -> Result<UploadResponse, UploadError> {
        let _guard = self.locks.lock(request.name.as_str()).await;

        let target = request.target();
        self.store
            .store_staged(&target, payload)
            .await
            .map_err(|e| {
                tracing::error!("Failed to store {}: {}", target.file_name(), e);
                e
            })?;

        let Some(part) = request.part else {
            tracing::info!("📥 Stored single upload {}", request.name);
            return Ok(UploadResponse::completed(&request));
        };

        let parts = self.inventory.list_parts(&request.name).await?;
        match completeness::evaluate(parts.iter().map(|p| p.index), part.total)? {
            Completeness::Incomplete { missing } => {
                tracing::info!(
                    "📥 Stored part {}/{} of {}, {} remaining",
                    part.index,
                    part.total,
                    request.name,
                    missing.len()
                );
                Ok(UploadResponse::pending(&request, missing))
            }
            Completeness::Complete => {
                tokio::time::timeout(
                    self.merge_timeout,
                    self.reassembler.merge(&request.name, parts),
                )
                .await
                .map_err(|_| {
                    tracing::error!(
                        "Merge of {} exceeded {:?}, parts kept for retry",
                        request.name,
                        self.merge_timeout
                    );
                    UploadError::MergeTimeout {
                        name: request.name.to_string(),
                        seconds: self.merge_timeout.as_secs(),
                    }
                })??;
                Ok(UploadResponse::completed(&request))
            }
        }
    }
}
