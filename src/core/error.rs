use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Non-standard status used when the client went away mid-download.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Centralized error types for the relay
///
/// Handlers return `AppResult<T>`; the `IntoResponse` impl below is the only place
/// where a failure becomes an HTTP status and JSON body. Messages are short and
/// user-facing, raw diagnostics travel in `details` only.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, malformed or unsupported input (400)
    #[error("{0}")]
    Validation(String),

    /// yt-dlp could not produce usable metadata (500)
    #[error("{message}")]
    MetadataFetch { message: String, details: Option<String> },

    /// The client disconnected before the download finished (499)
    #[error("Download cancelled by user")]
    DownloadCancelled,

    /// yt-dlp failed while fetching the media (500)
    #[error("Download failed: {details}")]
    DownloadFailed { details: String },

    /// Anything else reaching the HTTP boundary (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DownloadCancelled => {
                StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::REQUEST_TIMEOUT)
            }
            AppError::MetadataFetch { .. } | AppError::DownloadFailed { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns category for metrics and log lines
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::MetadataFetch { .. } => "metadata",
            AppError::DownloadCancelled => "cancelled",
            AppError::DownloadFailed { .. } => "download",
            AppError::Internal(_) => "internal",
        }
    }

    /// JSON body sent to the client
    pub fn body(&self) -> serde_json::Value {
        match self {
            AppError::Validation(message) => json!({ "error": message }),
            AppError::MetadataFetch {
                message,
                details: Some(details),
            } => json!({ "error": message, "details": details }),
            AppError::MetadataFetch { message, details: None } => json!({ "error": message }),
            AppError::DownloadCancelled => json!({ "error": "Download cancelled by user" }),
            AppError::DownloadFailed { details } => json!({ "error": "Download failed.", "details": details }),
            AppError::Internal(message) => json!({ "error": "Internal server error", "message": message }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::DownloadCancelled => log::info!("Request terminated by client"),
            AppError::Validation(msg) => log::warn!("Rejected request: {}", msg),
            other => log::error!("Request failed ({}): {}", other.category(), other),
        }
        (self.status_code(), Json(self.body())).into_response()
    }
}
