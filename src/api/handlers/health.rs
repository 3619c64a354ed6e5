use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub upload_dir: String,
    pub staging_dir: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let upload_dir = dir_status(&state.config.upload_dir).await;
    let staging_dir = dir_status(&state.config.staging_dir).await;

    let status = if upload_dir == "ok" && staging_dir == "ok" {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        upload_dir: upload_dir.to_string(),
        staging_dir: staging_dir.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn dir_status(path: &std::path::Path) -> &'static str {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => "ok",
        Ok(_) => "not a directory",
        Err(_) => "missing",
    }
}
