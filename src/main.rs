use clap::Parser;
use dotenvy::dotenv;
use rust_chunked_upload::config::UploadConfig;
use rust_chunked_upload::services::sweeper::PartSweeper;
use rust_chunked_upload::{AppState, create_app};
use std::net::SocketAddr;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Service type to run (api, sweeper, all)
    #[arg(short, long, default_value = "all")]
    mode: String,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_chunked_upload=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if !matches!(args.mode.as_str(), "api" | "sweeper" | "all") {
        anyhow::bail!("unknown mode {:?}, expected api, sweeper or all", args.mode);
    }

    info!("🚀 Starting chunked upload service [Mode: {}]...", args.mode);

    let config = UploadConfig::from_env();
    info!(
        "📁 Upload Config: dir={:?}, staging={:?}, Max Size={}MB, merge timeout={}s",
        config.upload_dir,
        config.staging_dir,
        config.max_file_size / 1024 / 1024,
        config.merge_timeout_secs
    );

    let state = AppState::from_config(config).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut handles = Vec::new();

    if args.mode == "sweeper" || args.mode == "all" {
        let sweeper = PartSweeper::new(&state.config, state.locks.clone(), shutdown_rx.clone());
        handles.push(tokio::spawn(sweeper.run()));
        info!("🧹 Part sweeper initialized.");
    }

    if args.mode == "api" || args.mode == "all" {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            );

        let app = create_app(state).layer(trace_layer);
        let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("✅ API Server listening on: http://0.0.0.0:{}", args.port);
        info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", args.port);

        let mut server_shutdown = shutdown_rx.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = server_shutdown.changed().await;
                })
                .await
            {
                error!("❌ Server runtime error: {}", e);
            }
        }));
    }

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    info!("🛑 Shutting down upload services...");
    for handle in handles {
        if let Err(e) = handle.await {
            error!("Task ended abnormally: {}", e);
        }
    }

    info!("👋 Upload service exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
