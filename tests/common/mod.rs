//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use dorarelay::core::web_server::{router, AppState};
use dorarelay::download::{DownloadOrchestrator, InvocationOutcome, MediaTool, Operation, ToolConfig};

/// One recorded call to [`FakeTool::invoke`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub args: Vec<String>,
    pub operation: Operation,
}

/// What the fake does for a single call
pub enum Step {
    Reply(InvocationOutcome),
    /// Waits for cancellation in a detached task, like the real invoker
    WaitForCancel,
}

/// Scripted stand-in for yt-dlp
pub struct FakeTool {
    config: ToolConfig,
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
    cancel_observed: Arc<AtomicBool>,
}

impl FakeTool {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Self::with_config(ToolConfig::system("yt-dlp"), steps)
    }

    pub fn with_config(config: ToolConfig, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            config,
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
            cancel_observed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn cancel_observed(&self) -> bool {
        self.cancel_observed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaTool for FakeTool {
    fn tool_config(&self) -> &ToolConfig {
        &self.config
    }

    async fn invoke(
        &self,
        target_url: &str,
        args: Vec<String>,
        operation: Operation,
        cancel: CancellationToken,
    ) -> InvocationOutcome {
        self.calls.lock().unwrap().push(RecordedCall {
            url: target_url.to_string(),
            args,
            operation,
        });

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(outcome)) => outcome,
            Some(Step::WaitForCancel) => {
                let observed = Arc::clone(&self.cancel_observed);
                let task = tokio::spawn(async move {
                    cancel.cancelled().await;
                    observed.store(true, Ordering::SeqCst);
                    InvocationOutcome::Cancelled
                });
                task.await.unwrap_or(InvocationOutcome::Cancelled)
            }
            None => InvocationOutcome::Failed {
                reason: "unexpected invocation".to_string(),
                exit_code: None,
            },
        }
    }
}

/// Successful metadata dump
pub fn metadata(doc: serde_json::Value) -> Step {
    Step::Reply(InvocationOutcome::Success(Bytes::from(doc.to_string())))
}

/// Successful media download
pub fn media(bytes: &'static [u8]) -> Step {
    Step::Reply(InvocationOutcome::Success(Bytes::from_static(bytes)))
}

pub fn failed(reason: &str, exit_code: i32) -> Step {
    Step::Reply(InvocationOutcome::Failed {
        reason: reason.to_string(),
        exit_code: Some(exit_code),
    })
}

/// Router backed by the given tool
pub fn app_with(tool: Arc<dyn MediaTool>) -> axum::Router {
    router(AppState::new(DownloadOrchestrator::new(tool)))
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Writes an executable `#!/bin/sh` script
#[cfg(unix)]
pub fn write_script(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// True while a process with this pid exists
#[cfg(unix)]
pub fn process_alive(pid: &str) -> bool {
    std::process::Command::new("kill")
        .args(["-0", pid])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Polls until `path` holds a non-empty value
pub async fn wait_for_file(path: &std::path::Path) -> String {
    for _ in 0..200 {
        if let Ok(contents) = std::fs::read_to_string(path) {
            let contents = contents.trim().to_string();
            if !contents.is_empty() {
                return contents;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    panic!("{} was never written", path.display());
}

/// Polls until the process is gone
#[cfg(unix)]
pub async fn wait_for_exit(pid: &str) -> bool {
    for _ in 0..200 {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    false
}
