//! Public HTTP API.
//!
//! Routes (also mounted under `/api`):
//! - `GET  /health`   - resolved yt-dlp setup
//! - `POST /info`     - metadata projection
//! - `POST /download` - media bytes as an attachment
//!
//! plus `GET /metrics` for Prometheus scraping.
//!
//! Each handler owns a `CancellationToken` behind a `DropGuard`. When the client
//! disconnects hyper drops the handler future, the guard cancels the token and
//! the running yt-dlp process is killed.

use std::any::Any;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{
        header::{self, HeaderName},
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::validation::ValidationError;
use crate::download::metadata::MediaMetadata;
use crate::download::orchestrator::{DownloadOrchestrator, DownloadRequest, InfoRequest};

/// Shared state for the API handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: DownloadOrchestrator,
}

impl AppState {
    pub fn new(orchestrator: DownloadOrchestrator) -> Self {
        Self { orchestrator }
    }
}

/// Builds the API router with CORS, panic catching and a body size limit.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/info", post(info_handler))
        .route("/download", post(download_handler));

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors_layer(&config::CORS_ALLOWED_ORIGINS))
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(DefaultBodyLimit::max(*config::server::MAX_BODY_BYTES)),
        )
        .with_state(state)
}

/// Start the API server and serve until Ctrl+C.
pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    log::info!("Starting API server on http://{}", addr);
    log::info!("  /health    - Backend and yt-dlp status");
    log::info!("  /info      - Video metadata (POST)");
    log::info!("  /download  - Media download (POST)");
    log::info!("  /metrics   - Prometheus metrics");

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down gracefully...");
}

/// CORS for the browser frontend. Invalid origins are skipped with a warning.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    log::info!("CORS allow-list loaded with {} origin(s): {:?}", allowed.len(), origins);

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .expose_headers([header::CONTENT_DISPOSITION, header::CONTENT_TYPE, header::CONTENT_LENGTH])
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    AppError::Internal(detail).into_response()
}

fn reject_body(rejection: JsonRejection) -> AppError {
    ValidationError::MalformedBody(rejection.body_text()).into()
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let tool = state.orchestrator.tool().tool_config();
    Json(json!({
        "status": "OK",
        "message": "Backend is running",
        "resolvedExecutablePath": tool.executable.display().to_string(),
        "usingSystemPath": tool.using_system_path,
        "version": tool.version,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// POST /info
async fn info_handler(
    State(state): State<AppState>,
    payload: Result<Json<InfoRequest>, JsonRejection>,
) -> AppResult<Json<MediaMetadata>> {
    let Json(body) = payload.map_err(reject_body)?;
    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    let info = state.orchestrator.fetch_info(body, cancel).await?;
    Ok(Json(info))
}

/// POST /download
async fn download_handler(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload.map_err(reject_body)?;
    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    let media = state.orchestrator.download(body, cancel).await?;

    let disposition = format!("attachment; filename=\"{}\"", media.filename);
    let headers: [(HeaderName, String); 2] = [
        (header::CONTENT_DISPOSITION, disposition),
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
    ];
    Ok((StatusCode::OK, headers, Body::from(media.payload)).into_response())
}

/// GET /metrics
async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            AppError::Internal(format!("Failed to encode metrics: {}", e)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_skips_invalid_origins() {
        // Must not panic on header values containing control characters
        let _ = build_cors_layer(&["http://localhost:3000".to_string(), "bad\norigin".to_string()]);
    }

    #[test]
    fn test_panic_payloads_become_internal_errors() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = handle_panic(Box::new(String::from("kaboom")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = handle_panic(Box::new(42_u32));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
