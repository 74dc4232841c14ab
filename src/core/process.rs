//! Process execution utilities with timeout support
//!
//! Short-lived helper commands (the yt-dlp `--version` probe) go through here.
//! Long-running invocations with cancellation live in `download::invoker`.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::core::error::AppError;

/// Timeout for the startup `--version` probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Run an async Command with a timeout.
///
/// Returns the process Output on success, or an AppError on timeout/IO failure.
/// The child is killed when the timeout fires.
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, AppError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(AppError::Internal(format!("Failed to run {:?}: {}", cmd.as_std().get_program(), e))),
        Err(_) => Err(AppError::Internal(format!(
            "Process timed out after {}s",
            timeout.as_secs()
        ))),
    }
}
