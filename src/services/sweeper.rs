use crate::config::UploadConfig;
use crate::services::inventory::PartInventory;
use crate::services::part_store::PartStore;
use crate::utils::upload_locks::UploadLocks;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::io;
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub parts_removed: usize,
    pub staged_removed: usize,
    pub locks_pruned: usize,
}

/// Removes parts of uploads that were abandoned before completion, plus
/// staging leftovers from transfers that never finished.
pub struct PartSweeper {
    inventory: PartInventory,
    store: PartStore,
    staging_dir: PathBuf,
    locks: UploadLocks,
    max_age: chrono::Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl PartSweeper {
    pub fn new(config: &UploadConfig, locks: UploadLocks, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            inventory: PartInventory::new(&config.upload_dir),
            store: PartStore::new(&config.upload_dir),
            staging_dir: config.staging_dir.clone(),
            locks,
            max_age: config.stale_part_age(),
            interval: config.sweep_interval(),
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Part sweeper started (interval {:?}, max age {}h)",
            self.interval,
            self.max_age.num_hours()
        );

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Part sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    match self.sweep(Utc::now()).await {
                        Ok(report) => tracing::info!("🧹 Sweep finished: {:?}", report),
                        Err(e) => tracing::error!("Sweep failed: {:#}", e),
                    }
                }
            }
        }
    }

    /// One pass removing everything last modified before `now - max_age`.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let cutoff = now - self.max_age;
        let mut report = SweepReport::default();

        let parts = self
            .inventory
            .list_all_parts()
            .await
            .context("listing upload directory")?;

        for (name, part) in parts {
            if part.modified >= cutoff {
                continue;
            }
            // Never pull a part out from under a merge in progress
            let _guard = self.locks.lock(&name).await;

            // The part may have been merged or uploaded again while we waited
            match tokio::fs::metadata(&part.location).await {
                Ok(metadata) => {
                    let modified = metadata.modified().map(DateTime::<Utc>::from);
                    if !matches!(modified, Ok(m) if m < cutoff) {
                        continue;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!("Could not stat {:?}: {}", part.location, e);
                    continue;
                }
            }

            match self.store.delete(&part.location).await {
                Ok(()) => {
                    tracing::info!("Removed abandoned part {} of {}", part.index, name);
                    report.parts_removed += 1;
                }
                Err(e) => tracing::warn!("Could not remove {:?}: {}", part.location, e),
            }
        }

        report.staged_removed = self.sweep_staging(cutoff).await?;
        report.locks_pruned = self.locks.prune();
        Ok(report)
    }

    async fn sweep_staging(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.staging_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e).context("listing staging directory"),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let stale = metadata
                .modified()
                .map(|m| DateTime::<Utc>::from(m) < cutoff)
                .unwrap_or(false);
            if metadata.is_file() && stale && tokio::fs::remove_file(entry.path()).await.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
