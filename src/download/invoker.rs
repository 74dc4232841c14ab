//! External tool invoker.
//!
//! Runs one yt-dlp process per call as `<executable> <url> <args...>`, drains
//! stdout and stderr concurrently, and resolves to exactly one
//! [`InvocationOutcome`]. Each invocation runs in its own tokio task, so the
//! process is still terminated when the caller's future is dropped: the caller
//! cancels the token (usually through a `DropGuard`) and the task kills and
//! reaps the child.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::metrics;
use crate::download::ytdlp::ToolConfig;

/// Result of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Exit code 0; carries everything written to stdout
    Success(Bytes),
    /// The cancellation token fired before the process exited
    Cancelled,
    /// Spawn error, non-zero exit, or timeout
    Failed { reason: String, exit_code: Option<i32> },
}

impl InvocationOutcome {
    /// Label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            InvocationOutcome::Success(_) => "success",
            InvocationOutcome::Cancelled => "cancelled",
            InvocationOutcome::Failed { .. } => "failed",
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        InvocationOutcome::Failed {
            reason: reason.into(),
            exit_code: None,
        }
    }
}

/// What an invocation is for; used in logs and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Metadata,
    Download,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Metadata => "metadata",
            Operation::Download => "download",
        }
    }
}

/// Something that can run the media tool.
///
/// `YtDlpInvoker` is the production implementation; tests substitute fakes.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// The executable this tool runs, for `/health`
    fn tool_config(&self) -> &ToolConfig;

    /// Runs the tool once against `target_url`. Never retries.
    async fn invoke(
        &self,
        target_url: &str,
        args: Vec<String>,
        operation: Operation,
        cancel: CancellationToken,
    ) -> InvocationOutcome;
}

/// Spawns yt-dlp using a [`ToolConfig`] resolved at startup
#[derive(Debug, Clone)]
pub struct YtDlpInvoker {
    tool: Arc<ToolConfig>,
    timeout: Option<Duration>,
}

impl YtDlpInvoker {
    pub fn new(tool: Arc<ToolConfig>) -> Self {
        Self { tool, timeout: None }
    }

    /// Adds a ceiling after which the process is killed and the call fails
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl MediaTool for YtDlpInvoker {
    fn tool_config(&self) -> &ToolConfig {
        &self.tool
    }

    async fn invoke(
        &self,
        target_url: &str,
        args: Vec<String>,
        operation: Operation,
        cancel: CancellationToken,
    ) -> InvocationOutcome {
        let mut arguments = Vec::with_capacity(args.len() + 1);
        arguments.push(target_url.to_string());
        arguments.extend(args);

        let invocation = ProcessInvocation {
            command_path: self.tool.executable.clone(),
            arguments,
            cancel,
            operation,
            timeout: self.timeout,
        };

        match tokio::spawn(invocation.run()).await {
            Ok(outcome) => outcome,
            Err(e) => InvocationOutcome::failed(format!("yt-dlp task failed: {}", e)),
        }
    }
}

/// One spawn-to-exit lifetime of the tool. Consumed by `run`.
#[derive(Debug)]
pub struct ProcessInvocation {
    pub command_path: PathBuf,
    /// Everything after the command, target URL first
    pub arguments: Vec<String>,
    pub cancel: CancellationToken,
    pub operation: Operation,
    pub timeout: Option<Duration>,
}

enum Exit {
    Status(io::Result<ExitStatus>),
    Cancelled,
    TimedOut(Duration),
}

impl ProcessInvocation {
    pub async fn run(self) -> InvocationOutcome {
        let started = Instant::now();
        let outcome = self.execute().await;
        let elapsed = started.elapsed();
        metrics::record_invocation(self.operation.as_str(), outcome.label(), elapsed.as_secs_f64());
        log::debug!(
            "yt-dlp {} finished in {:.1}s: {}",
            self.operation.as_str(),
            elapsed.as_secs_f64(),
            outcome.label()
        );
        outcome
    }

    async fn execute(&self) -> InvocationOutcome {
        if self.cancel.is_cancelled() {
            return InvocationOutcome::Cancelled;
        }

        let spawned = Command::new(&self.command_path)
            .args(&self.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                log::error!("Failed to spawn {}: {}", self.command_path.display(), e);
                return InvocationOutcome::failed(format!(
                    "Failed to spawn {}: {}",
                    self.command_path.display(),
                    e
                ));
            }
        };

        log::debug!(
            "Spawned yt-dlp {} (pid {:?})",
            self.operation.as_str(),
            child.id()
        );

        let stdout_task = child.stdout.take().map(|pipe| tokio::spawn(read_pipe(pipe)));
        let stderr_task = child.stderr.take().map(|pipe| tokio::spawn(read_pipe(pipe)));

        let timeout = self.timeout;
        let deadline = async move {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        let exit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Exit::Cancelled,
            status = child.wait() => Exit::Status(status),
            _ = deadline => Exit::TimedOut(timeout.unwrap_or_default()),
        };

        match exit {
            Exit::Cancelled => {
                log::info!("Download cancelled by user, terminating yt-dlp {}", self.operation.as_str());
                terminate(&mut child).await;
                abort_reader(stdout_task);
                abort_reader(stderr_task);
                InvocationOutcome::Cancelled
            }
            Exit::TimedOut(limit) => {
                log::error!("yt-dlp process timed out after {}s, killing", limit.as_secs());
                terminate(&mut child).await;
                abort_reader(stdout_task);
                abort_reader(stderr_task);
                InvocationOutcome::failed(format!("Process timed out after {}s", limit.as_secs()))
            }
            Exit::Status(Err(e)) => {
                abort_reader(stdout_task);
                abort_reader(stderr_task);
                InvocationOutcome::failed(format!("Failed to wait for yt-dlp: {}", e))
            }
            Exit::Status(Ok(status)) => {
                let stdout = collect_reader(stdout_task).await;
                let stderr = collect_reader(stderr_task).await;
                interpret_exit(status, stdout, &stderr)
            }
        }
    }
}

/// Maps an exit status and captured output to an outcome
fn interpret_exit(status: ExitStatus, stdout: Vec<u8>, stderr: &[u8]) -> InvocationOutcome {
    if status.success() {
        return InvocationOutcome::Success(Bytes::from(stdout));
    }

    let stderr_text = String::from_utf8_lossy(stderr).trim().to_string();
    let reason = if !stderr_text.is_empty() {
        stderr_text
    } else {
        match status.code() {
            Some(code) => format!("Process exited with code {}", code),
            None => "Process terminated by signal".to_string(),
        }
    };

    InvocationOutcome::Failed {
        reason,
        exit_code: status.code(),
    }
}

/// Sends a single kill request and reaps the child
async fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        log::warn!("Failed to signal yt-dlp: {}", e);
    }
    if let Err(e) = child.wait().await {
        log::warn!("Failed to reap yt-dlp: {}", e);
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(mut pipe: R) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf).await {
        log::warn!("Error reading yt-dlp output: {}", e);
    }
    buf
}

async fn collect_reader(task: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    match task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    }
}

fn abort_reader(task: Option<JoinHandle<Vec<u8>>>) {
    if let Some(handle) = task {
        handle.abort();
    }
}
