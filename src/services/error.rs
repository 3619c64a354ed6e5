use thiserror::Error;

/// Failures of the transfer itself, before anything is persisted.
/// The client can fix these by retrying or adjusting the upload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("The uploaded file exceeds the maximum upload size of {limit} bytes.")]
    IniSize { limit: u64 },

    #[error("The uploaded file exceeds the MAX_FILE_SIZE of {limit} bytes specified in the form.")]
    FormSize { limit: u64 },

    #[error("The uploaded file was only partially uploaded.")]
    Partial,

    #[error("No file was uploaded.")]
    NoFile,

    #[error("Missing a temporary folder.")]
    NoTmpDir,

    #[error("Failed to write file to disk.")]
    CantWrite,

    #[error("File extension '.{0}' is not allowed.")]
    Extension(String),
}

impl TransportError {
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::IniSize { .. } => "UPLOAD_ERR_INI_SIZE",
            TransportError::FormSize { .. } => "UPLOAD_ERR_FORM_SIZE",
            TransportError::Partial => "UPLOAD_ERR_PARTIAL",
            TransportError::NoFile => "UPLOAD_ERR_NO_FILE",
            TransportError::NoTmpDir => "UPLOAD_ERR_NO_TMP_DIR",
            TransportError::CantWrite => "UPLOAD_ERR_CANT_WRITE",
            TransportError::Extension(_) => "UPLOAD_ERR_EXTENSION",
        }
    }
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Merge of {name} did not finish within {seconds}s")]
    MergeTimeout { name: String, seconds: u64 },
}

impl UploadError {
    pub fn invalid(message: impl Into<String>) -> Self {
        UploadError::InvalidRequest(message.into())
    }
}
