use crate::models::ErrorResponse;
use crate::services::error::UploadError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
}

impl From<crate::services::error::TransportError> for AppError {
    fn from(e: crate::services::error::TransportError) -> Self {
        AppError::Upload(UploadError::Transport(e))
    }
}

impl AppError {
    fn invalid(message: String) -> (StatusCode, ErrorResponse) {
        (
            StatusCode::BAD_REQUEST,
            ErrorResponse {
                error: "INVALID_REQUEST".to_string(),
                message: Some(message),
            },
        )
    }

    fn unknown() -> (StatusCode, ErrorResponse) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse {
                error: "Unknown Error".to_string(),
                message: None,
            },
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Upload(UploadError::Transport(e)) => {
                tracing::warn!("Upload rejected: {} ({})", e.code(), e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorResponse {
                        error: e.code().to_string(),
                        message: Some(e.to_string()),
                    },
                )
            }
            AppError::Upload(UploadError::InvalidRequest(msg)) => {
                tracing::warn!("Invalid upload request: {}", msg);
                Self::invalid(msg)
            }
            AppError::Upload(e @ (UploadError::Io(_) | UploadError::MergeTimeout { .. })) => {
                tracing::error!("Upload failed: {:?}", e);
                Self::unknown()
            }
        };

        (status, Json(body)).into_response()
    }
}
