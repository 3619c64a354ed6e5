use crate::models::{StoredPart, UploadName};
use chrono::{DateTime, Utc};
use std::io;
use std::path::PathBuf;
use tokio::fs;

/// Finds the part files of uploads by scanning the upload directory.
///
/// The directory listing is the only record of which parts exist; no ordering
/// is promised, callers sort by index themselves.
#[derive(Debug, Clone)]
pub struct PartInventory {
    upload_dir: PathBuf,
}

impl PartInventory {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    /// Parts currently stored for `name`. Empty when there are none.
    pub async fn list_parts(&self, name: &UploadName) -> io::Result<Vec<StoredPart>> {
        let mut parts = Vec::new();
        for (base, part) in self.scan().await? {
            if base == name.as_str() {
                parts.push(part);
            }
        }
        Ok(parts)
    }

    /// Every part file in the directory, paired with the upload name it belongs to.
    pub async fn list_all_parts(&self) -> io::Result<Vec<(String, StoredPart)>> {
        self.scan().await
    }

    async fn scan(&self) -> io::Result<Vec<(String, StoredPart)>> {
        let mut entries = match fs::read_dir(&self.upload_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some((base, index)) = parse_part_file_name(file_name) else {
                continue;
            };

            // Another request may have merged and removed it since the listing
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            found.push((
                base.to_string(),
                StoredPart {
                    index,
                    location: entry.path(),
                    size: metadata.len(),
                    modified,
                },
            ));
        }

        Ok(found)
    }
}

/// Splits `<name>.<index>` into its parts.
///
/// The index must be canonical decimal (no sign, no leading zero) so that each
/// index maps to exactly one file name.
pub fn parse_part_file_name(file_name: &str) -> Option<(&str, u32)> {
    let (base, suffix) = file_name.rsplit_once('.')?;
    if base.is_empty() || base.starts_with('.') {
        return None;
    }
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if suffix.len() > 1 && suffix.starts_with('0') {
        return None;
    }
    let index = suffix.parse().ok()?;
    Some((base, index))
}
