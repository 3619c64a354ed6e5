use crate::services::error::UploadError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use utoipa::ToSchema;

/// Client-supplied upload name that passed sanitization and is safe to use
/// as a single path segment inside the upload directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadName(String);

impl UploadName {
    pub(crate) fn from_sanitized(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of part `index` of this upload.
    pub fn part_file_name(&self, index: u32) -> String {
        format!("{}.{}", self.0, index)
    }
}

impl fmt::Display for UploadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpec {
    pub index: u32,
    pub total: u32,
}

/// Everything the coordinator needs to know about one incoming upload request.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub name: UploadName,
    pub part: Option<PartSpec>,
}

impl UploadRequest {
    pub fn single(name: UploadName) -> Self {
        Self { name, part: None }
    }

    pub fn multipart(name: UploadName, index: u32, total: u32) -> Result<Self, UploadError> {
        if total == 0 {
            return Err(UploadError::invalid("totalParts must be a positive integer"));
        }
        if index == 0 || index > total {
            return Err(UploadError::invalid(format!(
                "currentPart {} is outside 1..={}",
                index, total
            )));
        }
        Ok(Self {
            name,
            part: Some(PartSpec { index, total }),
        })
    }

    pub fn target(&self) -> UploadTarget {
        match self.part {
            Some(part) => UploadTarget::Part {
                name: self.name.clone(),
                index: part.index,
            },
            None => UploadTarget::Whole(self.name.clone()),
        }
    }

    pub fn success_message(&self) -> String {
        match self.part {
            Some(part) => format!("file {} part {} uploaded.", self.name, part.index),
            None => format!("file {} uploaded.", self.name),
        }
    }
}

/// Where a stored payload lands inside the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    Whole(UploadName),
    Part { name: UploadName, index: u32 },
}

impl UploadTarget {
    pub fn file_name(&self) -> String {
        match self {
            UploadTarget::Whole(name) => name.as_str().to_string(),
            UploadTarget::Part { name, index } => name.part_file_name(*index),
        }
    }
}

/// A part file found on disk.
#[derive(Debug, Clone)]
pub struct StoredPart {
    pub index: u32,
    pub location: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<UploadMeta>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadMeta {
    pub remaining_parts: Vec<u32>,
}

impl UploadResponse {
    pub fn completed(request: &UploadRequest) -> Self {
        Self {
            message: request.success_message(),
            meta: request.part.map(|_| UploadMeta {
                remaining_parts: Vec::new(),
            }),
        }
    }

    pub fn pending(request: &UploadRequest, remaining_parts: Vec<u32>) -> Self {
        Self {
            message: request.success_message(),
            meta: Some(UploadMeta { remaining_parts }),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
