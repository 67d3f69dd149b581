use anyhow::Result;
use axum::{Router, extract::DefaultBodyLimit};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::routes::create_router;
use crate::config::EngineConfig;
use crate::state::AppState;
use crate::uploads::UPLOADS_PATH;

// Room for a handful of phone photos in one upload request.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Full application: API routes, stored uploads, CORS and request tracing.
pub fn build_app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.uploads.dir());

    create_router()
        .nest_service(UPLOADS_PATH, uploads)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: EngineConfig, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
    let state = AppState::from_config(&config);
    tokio::fs::create_dir_all(state.uploads.dir()).await?;

    let app = build_app(state);

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(
        addr = %config.bind,
        upload_dir = %config.upload_dir.display(),
        redaction = if config.vision_url.is_some() { "vision" } else { "passthrough" },
        "PrismChat mock backend listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await?;

    Ok(())
}

async fn shutdown_signal(mut shutdown_rx: watch::Receiver<bool>) {
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
    tracing::info!("shutting down API server");
}
