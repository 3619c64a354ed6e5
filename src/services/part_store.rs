use crate::models::{UploadName, UploadTarget};
use crate::services::staging::StagedPayload;
use std::io;
use std::path::{Path, PathBuf};

/// Flat file namespace holding parts (`<name>.<index>`) and finished uploads (`<name>`).
#[derive(Debug, Clone)]
pub struct PartStore {
    upload_dir: PathBuf,
}

impl PartStore {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn location(&self, target: &UploadTarget) -> PathBuf {
        self.upload_dir.join(target.file_name())
    }

    /// Writes `bytes` as part `index` of `name`, replacing an earlier copy.
    pub async fn store_part(
        &self,
        name: &UploadName,
        index: u32,
        bytes: &[u8],
    ) -> io::Result<PathBuf> {
        let location = self.location(&UploadTarget::Part {
            name: name.clone(),
            index,
        });
        tokio::fs::write(&location, bytes).await?;
        Ok(location)
    }

    /// Moves a staged payload onto `target`. Last write wins.
    pub async fn store_staged(
        &self,
        target: &UploadTarget,
        payload: StagedPayload,
    ) -> io::Result<PathBuf> {
        let location = self.location(target);
        let size = payload.size();
        let dest = location.clone();

        tokio::task::spawn_blocking(move || payload.persist(&dest))
            .await
            .map_err(io::Error::other)??;

        tracing::debug!("Stored {} bytes at {:?}", size, location);
        Ok(location)
    }

    pub async fn delete(&self, location: &Path) -> io::Result<()> {
        match tokio::fs::remove_file(location).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
