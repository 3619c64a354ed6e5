#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_chunked_upload::config::UploadConfig;
use rust_chunked_upload::{AppState, create_app};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

pub struct TestApp {
    pub app: Router,
    pub dir: TempDir,
    pub config: UploadConfig,
}

pub async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

pub async fn setup_with(adjust: impl FnOnce(&mut UploadConfig)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = UploadConfig::development().with_upload_dir(dir.path());
    adjust(&mut config);

    let state = AppState::from_config(config.clone()).await.unwrap();
    TestApp {
        app: create_app(state),
        dir,
        config,
    }
}

/// Builds a multipart/form-data body. `file` is (client file name, bytes).
pub fn form_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub async fn upload_part(
    app: &Router,
    filename: &str,
    current: u32,
    total: u32,
    bytes: &[u8],
) -> (StatusCode, Value) {
    let current = current.to_string();
    let total = total.to_string();
    let body = form_body(
        &[
            ("filename", filename),
            ("multipart", "true"),
            ("currentPart", &current),
            ("totalParts", &total),
        ],
        Some(("blob", bytes)),
    );
    send(app, upload_request(body)).await
}
