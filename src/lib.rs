//! Dorarelay - HTTP download relay in front of yt-dlp
//!
//! Accepts a media URL, resolves the requested quality into a yt-dlp format
//! expression, runs yt-dlp and hands the bytes back to the caller. A client
//! disconnect cancels the running process.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, metrics, validation and the HTTP API
//! - `download`: Format resolution, yt-dlp invocation and the download orchestrator
//! - `cli`: Command-line interface

pub mod cli;
pub mod core;
pub mod download;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use crate::download::{DownloadOrchestrator, MediaTool, ToolConfig, YtDlpInvoker};
