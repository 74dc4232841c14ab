//! Download orchestration: format resolution, yt-dlp invocation and metadata

pub mod format;
pub mod invoker;
pub mod metadata;
pub mod orchestrator;
pub mod platform;
pub mod ytdlp;

// Re-exports for convenience
pub use invoker::{InvocationOutcome, MediaTool, Operation, YtDlpInvoker};
pub use orchestrator::{DownloadOrchestrator, DownloadRequest, InfoRequest};
pub use platform::Platform;
pub use ytdlp::ToolConfig;
