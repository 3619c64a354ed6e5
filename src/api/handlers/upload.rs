use crate::AppState;
use crate::api::error::AppError;
use crate::models::UploadResponse;
use crate::services::error::{TransportError, UploadError};
use crate::services::staging::StagedPayload;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};

use super::types::RawUploadForm;

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadFormSchema, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File or part stored", body = UploadResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 422, description = "Transfer failed", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "upload"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut raw = RawUploadForm::default();
    let mut client_name: Option<String> = None;
    let mut staged: Option<StagedPayload> = None;
    let limit = state.rules.max_file_size as u64;

    let received: Result<(), AppError> = async {
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| transport_failure(e, limit))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                client_name = field.file_name().map(str::to_string);

                let mut staging = state.staging.begin().await?;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| transport_failure(e, limit))?
                {
                    staging.write_chunk(&chunk).await?;
                }
                staged = Some(staging.finish().await?);
            } else {
                let value = field.text().await.map_err(|e| transport_failure(e, limit))?;
                if !raw.set(&name, value) {
                    tracing::debug!("Ignoring unknown form field {:?}", name);
                }
            }
        }
        Ok(())
    }
    .await;

    if let Err(e) = received {
        // Drain whatever is left so the client sees our error instead of a reset connection
        tracing::warn!("Upload failed while receiving: {}. Consuming remaining stream...", e);
        while let Ok(Some(mut field)) = multipart.next_field().await {
            while let Ok(Some(_)) = field.chunk().await {}
        }
        return Err(e);
    }

    let payload = staged.ok_or(TransportError::NoFile)?;
    let form = raw.parse()?;
    form.check_declared_size(payload.size())?;
    let request = form.into_request(client_name.as_deref(), &state.rules)?;

    let response = state.coordinator.handle(request, payload).await?;
    Ok(Json(response))
}

/// Errors reading the multipart body are failures of the transfer itself.
fn transport_failure(e: MultipartError, limit: u64) -> AppError {
    let text = e.body_text();
    let error = if e.status() == StatusCode::PAYLOAD_TOO_LARGE
        || text.contains("length limit exceeded")
    {
        TransportError::IniSize { limit }
    } else {
        tracing::debug!("Multipart stream broke: {}", text);
        TransportError::Partial
    };
    AppError::Upload(UploadError::Transport(error))
}
