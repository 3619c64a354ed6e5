use crate::services::error::TransportError;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Prefix of in-flight payload files inside the staging directory
pub const STAGED_PREFIX: &str = "upload-";

/// Holding area for payloads still being received.
///
/// A payload is written here in full before anything in the upload directory
/// is touched, so a broken transfer never leaves a half-written part behind.
#[derive(Debug, Clone)]
pub struct Staging {
    dir: PathBuf,
    max_file_size: u64,
}

impl Staging {
    pub fn new(dir: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            dir: dir.into(),
            max_file_size,
        }
    }

    pub async fn begin(&self) -> Result<StagingFile, TransportError> {
        let named = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| {
                tracing::error!("Cannot create staging file in {:?}: {}", self.dir, e);
                TransportError::NoTmpDir
            })?;
        let (file, path) = named.into_parts();

        Ok(StagingFile {
            file: File::from_std(file),
            path,
            written: 0,
            limit: self.max_file_size,
        })
    }

    /// Stages a complete in-memory payload in one go.
    pub async fn stage_bytes(&self, bytes: &[u8]) -> Result<StagedPayload, TransportError> {
        let mut staging = self.begin().await?;
        staging.write_chunk(bytes).await?;
        staging.finish().await
    }
}

/// A payload being received. Dropping it removes the file.
#[derive(Debug)]
pub struct StagingFile {
    file: File,
    path: TempPath,
    written: u64,
    limit: u64,
}

impl StagingFile {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), TransportError> {
        self.written += chunk.len() as u64;
        if self.written > self.limit {
            return Err(TransportError::IniSize { limit: self.limit });
        }

        self.file.write_all(chunk).await.map_err(|e| {
            tracing::error!("Write to staging file {:?} failed: {}", self.path, e);
            TransportError::CantWrite
        })
    }

    pub async fn finish(mut self) -> Result<StagedPayload, TransportError> {
        if self.written == 0 {
            return Err(TransportError::NoFile);
        }

        self.file.flush().await.map_err(|_| TransportError::CantWrite)?;
        self.file.sync_all().await.map_err(|_| TransportError::CantWrite)?;

        Ok(StagedPayload {
            path: self.path,
            size: self.written,
        })
    }
}

/// A fully received payload waiting to be stored. Dropping it removes the file.
#[derive(Debug)]
pub struct StagedPayload {
    path: TempPath,
    size: u64,
}

impl StagedPayload {
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renames the payload onto `dest`, replacing whatever is there.
    pub(crate) fn persist(self, dest: &Path) -> io::Result<()> {
        self.path.persist(dest).map_err(|e| e.error)
    }
}
