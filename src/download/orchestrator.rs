//! Download orchestrator.
//!
//! Drives one request through
//!   validate → fetch metadata → build parameters → stream media
//! and turns invoker outcomes into `AppError`s. Metadata always completes before
//! the media invocation starts, and a failed invocation ends the request: there
//! is no retry and no fallback to another format expression.
//!
//! Provides two entry points:
//! - `fetch_info()`: metadata projection only (`/info`)
//! - `download()`: full download (`/download`)

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::metrics;
use crate::core::validation::{require_supported_url, sanitize_title, ValidationError};
use crate::download::format::{resolve, FormatSelection};
use crate::download::invoker::{InvocationOutcome, MediaTool, Operation};
use crate::download::metadata::{MediaMetadata, RawVideoInfo};
use crate::download::platform::Platform;
use crate::download::ytdlp::{download_args, metadata_args};

/// Format token used when the client sends none
pub const DEFAULT_FORMAT_TOKEN: &str = "best";

/// Body of `POST /download`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadRequest {
    pub url: Option<String>,
    pub format: Option<String>,
    pub platform: Option<String>,
}

/// Body of `POST /info`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoRequest {
    pub url: Option<String>,
}

/// A download request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub url: String,
    pub format_token: String,
    pub platform: Platform,
}

impl MediaRequest {
    /// Validates the URL and fills in defaults. Never spawns anything.
    pub fn from_body(body: DownloadRequest) -> Result<Self, ValidationError> {
        let url = require_supported_url(body.url.as_deref())?.to_string();
        let format_token = body
            .format
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FORMAT_TOKEN.to_string());
        let platform = Platform::detect(&url, body.platform.as_deref());
        Ok(Self {
            url,
            format_token,
            platform,
        })
    }
}

/// Stage a download request is in; logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStage {
    Validating,
    FetchingMetadata,
    BuildingParameters,
    StreamingMedia,
    Completed,
    Cancelled,
    Failed,
}

impl fmt::Display for DownloadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DownloadStage::Validating => "validating",
            DownloadStage::FetchingMetadata => "fetching metadata",
            DownloadStage::BuildingParameters => "building parameters",
            DownloadStage::StreamingMedia => "streaming media",
            DownloadStage::Completed => "completed",
            DownloadStage::Cancelled => "cancelled",
            DownloadStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Parameters computed between the metadata and media invocations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    /// `<sanitized title>.mp4`
    pub filename: String,
    pub format: FormatSelection,
    /// Arguments after the URL
    pub args: Vec<String>,
}

impl DownloadPlan {
    pub fn build(title: &str, request: &MediaRequest) -> Self {
        let format = resolve(&request.format_token, request.platform);
        let args = download_args(&format, request.platform);
        Self {
            filename: download_filename(title),
            format,
            args,
        }
    }
}

/// A finished download, ready to be written to the response
#[derive(Debug, Clone)]
pub struct PreparedMedia {
    pub filename: String,
    pub format: FormatSelection,
    pub payload: Bytes,
}

/// Builds `<sanitized title>.mp4`, falling back to a fixed stem when the title sanitizes to nothing
pub fn download_filename(title: &str) -> String {
    let stem = sanitize_title(title);
    let stem = if stem.is_empty() {
        config::ytdlp::DEFAULT_FILENAME_STEM
    } else {
        stem.as_str()
    };
    format!("{}.{}", stem, config::ytdlp::DOWNLOAD_EXTENSION)
}

/// Coordinates metadata and media invocations for the HTTP layer
#[derive(Clone)]
pub struct DownloadOrchestrator {
    tool: Arc<dyn MediaTool>,
}

impl DownloadOrchestrator {
    pub fn new(tool: Arc<dyn MediaTool>) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &dyn MediaTool {
        self.tool.as_ref()
    }

    /// Metadata projection for `/info`.
    ///
    /// Uses the plain metadata arguments regardless of platform.
    pub async fn fetch_info(&self, body: InfoRequest, cancel: CancellationToken) -> AppResult<MediaMetadata> {
        let url = match require_supported_url(body.url.as_deref()) {
            Ok(url) => url,
            Err(e) => {
                metrics::record_info("rejected");
                return Err(e.into());
            }
        };
        log::info!("Fetching info for {}", url);

        let outcome = self
            .tool
            .invoke(url, metadata_args(Platform::Standard), Operation::Metadata, cancel)
            .await;

        let result = match outcome {
            InvocationOutcome::Success(stdout) if is_blank(&stdout) => Err(AppError::MetadataFetch {
                message: "Could not fetch video information.".to_string(),
                details: None,
            }),
            InvocationOutcome::Success(stdout) => RawVideoInfo::parse(&stdout)
                .map(|raw| MediaMetadata::from(&raw))
                .map_err(|e| info_failure(e.to_string())),
            InvocationOutcome::Cancelled => Err(AppError::DownloadCancelled),
            InvocationOutcome::Failed { reason, .. } => Err(info_failure(reason)),
        };

        metrics::record_info(if result.is_ok() { "completed" } else { "failed" });
        result
    }

    /// Full download for `/download`.
    ///
    /// `cancel` must fire when the client goes away; both invocations observe it.
    pub async fn download(&self, body: DownloadRequest, cancel: CancellationToken) -> AppResult<PreparedMedia> {
        log_stage(None, DownloadStage::Validating);
        let request = match MediaRequest::from_body(body) {
            Ok(request) => request,
            Err(e) => {
                metrics::record_download("rejected", false);
                return Err(e.into());
            }
        };

        let tracker = DownloadTracker::new(&request);
        let result = self.run(&request, cancel).await;
        tracker.finish(&result);
        result
    }

    async fn run(&self, request: &MediaRequest, cancel: CancellationToken) -> AppResult<PreparedMedia> {
        log_stage(Some(request), DownloadStage::FetchingMetadata);
        let info = self.fetch_download_metadata(request, cancel.clone()).await?;

        log_stage(Some(request), DownloadStage::BuildingParameters);
        let plan = DownloadPlan::build(info.display_title(), request);
        log::info!("Using format: {} for {}", plan.format, plan.filename);

        log_stage(Some(request), DownloadStage::StreamingMedia);
        let outcome = self
            .tool
            .invoke(&request.url, plan.args, Operation::Download, cancel)
            .await;

        match outcome {
            InvocationOutcome::Success(payload) => {
                log::info!("Download finished: {} ({} bytes)", plan.filename, payload.len());
                Ok(PreparedMedia {
                    filename: plan.filename,
                    format: plan.format,
                    payload,
                })
            }
            InvocationOutcome::Cancelled => Err(AppError::DownloadCancelled),
            InvocationOutcome::Failed { reason, exit_code } => {
                log::error!("yt-dlp download failed (exit code {:?}): {}", exit_code, reason);
                Err(AppError::DownloadFailed { details: reason })
            }
        }
    }

    async fn fetch_download_metadata(&self, request: &MediaRequest, cancel: CancellationToken) -> AppResult<RawVideoInfo> {
        let outcome = self
            .tool
            .invoke(&request.url, metadata_args(request.platform), Operation::Metadata, cancel)
            .await;

        match outcome {
            InvocationOutcome::Success(stdout) if is_blank(&stdout) => Err(AppError::MetadataFetch {
                message: "Could not fetch video information for download.".to_string(),
                details: None,
            }),
            InvocationOutcome::Success(stdout) => {
                RawVideoInfo::parse(&stdout).map_err(|e| AppError::DownloadFailed { details: e.to_string() })
            }
            InvocationOutcome::Cancelled => Err(AppError::DownloadCancelled),
            InvocationOutcome::Failed { reason, .. } => Err(AppError::DownloadFailed { details: reason }),
        }
    }
}

/// Records the terminal stage of a download.
///
/// When the handler future is dropped mid-download (client disconnect) `finish`
/// never runs, so `Drop` records the request as cancelled.
struct DownloadTracker {
    request: MediaRequest,
    finished: bool,
}

impl DownloadTracker {
    fn new(request: &MediaRequest) -> Self {
        Self {
            request: request.clone(),
            finished: false,
        }
    }

    fn finish(mut self, result: &AppResult<PreparedMedia>) {
        let (stage, outcome) = match result {
            Ok(_) => (DownloadStage::Completed, "completed"),
            Err(AppError::DownloadCancelled) => (DownloadStage::Cancelled, "cancelled"),
            Err(_) => (DownloadStage::Failed, "failed"),
        };
        self.record(stage, outcome);
    }

    fn record(&mut self, stage: DownloadStage, outcome: &str) {
        self.finished = true;
        log_stage(Some(&self.request), stage);
        metrics::record_download(outcome, self.request.platform.is_tiktok());
    }
}

impl Drop for DownloadTracker {
    fn drop(&mut self) {
        if !self.finished {
            self.record(DownloadStage::Cancelled, "cancelled");
        }
    }
}

fn info_failure(details: String) -> AppError {
    AppError::MetadataFetch {
        message: "Failed to fetch video information.".to_string(),
        details: Some(details),
    }
}

fn is_blank(stdout: &[u8]) -> bool {
    stdout.iter().all(u8::is_ascii_whitespace)
}

fn log_stage(request: Option<&MediaRequest>, stage: DownloadStage) {
    match request {
        Some(r) => log::info!("[{}] {} ({:?}, format {})", stage, r.url, r.platform, r.format_token),
        None => log::debug!("[{}] new download request", stage),
    }
}
