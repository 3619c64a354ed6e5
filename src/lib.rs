pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::UploadConfig;
use crate::services::coordinator::UploadCoordinator;
use crate::services::staging::Staging;
use crate::utils::upload_locks::UploadLocks;
use crate::utils::validation::ValidationRules;
use axum::{
    Router,
    http::{Method, header},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_file,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::types::UploadFormSchema,
            api::handlers::health::HealthResponse,
            models::UploadResponse,
            models::UploadMeta,
            models::ErrorResponse,
        )
    ),
    tags(
        (name = "upload", description = "Single and multipart file upload"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<UploadCoordinator>,
    pub staging: Arc<Staging>,
    pub rules: Arc<ValidationRules>,
    pub locks: UploadLocks,
    pub config: UploadConfig,
}

impl AppState {
    /// Creates the upload and staging directories and wires the services together.
    pub async fn from_config(config: UploadConfig) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&config.upload_dir).await?;
        tokio::fs::create_dir_all(&config.staging_dir).await?;

        let locks = UploadLocks::new();
        Ok(Self {
            coordinator: Arc::new(UploadCoordinator::from_config(&config, locks.clone())),
            staging: Arc::new(Staging::new(
                &config.staging_dir,
                config.max_file_size as u64,
            )),
            rules: Arc::new(ValidationRules::from_config(&config)),
            locks,
            config,
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    // Browsers upload from arbitrary origins; echo whichever one asked
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ORIGIN,
            header::HeaderName::from_static("x-requested-with"),
            header::HeaderName::from_static(api::middleware::request_id::REQUEST_ID_HEADER),
        ]);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/upload", post(api::handlers::upload::upload_file))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors)
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + 10 * 1024 * 1024, // Add 10MB buffer for multipart overhead
        ))
        .with_state(state)
}
