use crate::models::{StoredPart, UploadName};
use crate::services::error::UploadError;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Prefix of merge outputs while they are still being written
pub const MERGE_PREFIX: &str = "merge-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedUpload {
    pub location: PathBuf,
    pub size: u64,
    pub parts: usize,
}

/// Concatenates the parts of an upload into its final file.
#[derive(Debug, Clone)]
pub struct Reassembler {
    upload_dir: PathBuf,
    staging_dir: PathBuf,
}

impl Reassembler {
    pub fn new(upload_dir: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            staging_dir: staging_dir.into(),
        }
    }

    /// Writes the parts, in ascending index order, to `<upload_dir>/<name>` and
    /// removes them afterwards.
    ///
    /// The output is assembled in the staging directory and renamed into place
    /// only once every byte is on disk. If anything fails before that, the
    /// partial output is discarded and all parts are left untouched for a retry.
    pub async fn merge(
        &self,
        name: &UploadName,
        mut parts: Vec<StoredPart>,
    ) -> Result<MergedUpload, UploadError> {
        parts.sort_by_key(|p| p.index);
        parts.dedup_by_key(|p| p.index);

        let destination = self.upload_dir.join(name.as_str());
        tracing::info!(
            "Merging {} parts of {} into {:?}",
            parts.len(),
            name,
            destination
        );

        let staging_dir = self.staging_dir.clone();
        let (file, temp_path) = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(MERGE_PREFIX)
                .tempfile_in(staging_dir)
        })
        .await
        .map_err(io::Error::other)??
        .into_parts();
        let mut output = File::from_std(file);

        let mut size = 0u64;
        for part in &parts {
            let mut input = File::open(&part.location).await.map_err(|e| {
                tracing::error!("Cannot open part {} of {}: {}", part.index, name, e);
                e
            })?;
            size += tokio::io::copy(&mut input, &mut output).await.map_err(|e| {
                tracing::error!("Copying part {} of {} failed: {}", part.index, name, e);
                e
            })?;
        }

        output.flush().await?;
        output.sync_all().await?;
        drop(output);

        let dest = destination.clone();
        tokio::task::spawn_blocking(move || temp_path.persist(&dest).map_err(|e| e.error))
            .await
            .map_err(io::Error::other)??;

        for part in &parts {
            remove_part(&part.location).await;
        }

        tracing::info!("✅ Merged {} ({} bytes from {} parts)", name, size, parts.len());
        Ok(MergedUpload {
            location: destination,
            size,
            parts: parts.len(),
        })
    }
}

async fn remove_part(location: &Path) {
    match tokio::fs::remove_file(location).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        // The merged file is already in place; the sweeper collects leftovers
        Err(e) => tracing::warn!("Could not remove merged part {:?}: {}", location, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::inventory::PartInventory;
    use crate::services::part_store::PartStore;
    use crate::utils::validation::sanitize_upload_name;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        store: PartStore,
        inventory: PartInventory,
        reassembler: Reassembler,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join(".staging");
        std::fs::create_dir(&staging).unwrap();
        Fixture {
            store: PartStore::new(dir.path()),
            inventory: PartInventory::new(dir.path()),
            reassembler: Reassembler::new(dir.path(), &staging),
            dir,
        }
    }

    #[tokio::test]
    async fn test_merge_orders_by_index_not_arrival() {
        let f = fixture();
        let name = sanitize_upload_name("image.png").unwrap();
        let payloads: [&[u8]; 4] = [b"\x89PNG\r\n", b"\x00\x00\xff", b"line\n", b"tail-no-newline"];

        // Stored back to front so creation order disagrees with index order
        for index in (1..=4u32).rev() {
            f.store
                .store_part(&name, index, payloads[index as usize - 1])
                .await
                .unwrap();
        }

        let parts = f.inventory.list_parts(&name).await.unwrap();
        let merged = f.reassembler.merge(&name, parts).await.unwrap();

        let expected: Vec<u8> = payloads.concat();
        assert_eq!(merged.location, f.dir.path().join("image.png"));
        assert_eq!(merged.size, expected.len() as u64);
        assert_eq!(merged.parts, 4);
        assert_eq!(std::fs::read(&merged.location).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_merge_removes_parts() {
        let f = fixture();
        let name = sanitize_upload_name("data.bin").unwrap();
        for index in 1..=3 {
            f.store.store_part(&name, index, &[index as u8; 100]).await.unwrap();
        }

        let parts = f.inventory.list_parts(&name).await.unwrap();
        let total: u64 = parts.iter().map(|p| p.size).sum();
        let merged = f.reassembler.merge(&name, parts).await.unwrap();

        assert!(f.inventory.list_parts(&name).await.unwrap().is_empty());
        assert_eq!(std::fs::metadata(&merged.location).unwrap().len(), total);
        assert_eq!(
            std::fs::read_dir(f.dir.path().join(".staging")).unwrap().count(),
            0
        );
    }

    #[tokio::test]
    async fn test_failed_merge_keeps_parts_and_publishes_nothing() {
        let f = fixture();
        let name = sanitize_upload_name("broken.bin").unwrap();
        for index in 1..=3 {
            f.store.store_part(&name, index, b"chunk").await.unwrap();
        }
        let parts = f.inventory.list_parts(&name).await.unwrap();

        // Part 2 disappears after the inventory was taken
        std::fs::remove_file(f.dir.path().join("broken.bin.2")).unwrap();

        let err = f.reassembler.merge(&name, parts).await.unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));

        assert!(!f.dir.path().join("broken.bin").exists());
        assert!(f.dir.path().join("broken.bin.1").exists());
        assert!(f.dir.path().join("broken.bin.3").exists());
        assert_eq!(
            std::fs::read_dir(f.dir.path().join(".staging")).unwrap().count(),
            0
        );
    }

    #[tokio::test]
    async fn test_merge_replaces_previous_final_file() {
        let f = fixture();
        let name = sanitize_upload_name("report.csv").unwrap();
        std::fs::write(f.dir.path().join("report.csv"), b"stale contents").unwrap();
        f.store.store_part(&name, 1, b"a,b\n").await.unwrap();
        f.store.store_part(&name, 2, b"1,2\n").await.unwrap();

        let parts = f.inventory.list_parts(&name).await.unwrap();
        f.reassembler.merge(&name, parts).await.unwrap();

        assert_eq!(
            std::fs::read(f.dir.path().join("report.csv")).unwrap(),
            b"a,b\n1,2\n"
        );
    }
}
