use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::process::Command;

use crate::core::config;
use crate::core::error::AppError;
use crate::core::metrics;
use crate::core::process::{run_with_timeout, PROBE_TIMEOUT};
use crate::download::format::FormatSelection;
use crate::download::platform::Platform;

/// Resolved yt-dlp executable, decided once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Path or bare command name handed to `Command::new`
    pub executable: PathBuf,
    /// True when the executable is looked up through PATH
    pub using_system_path: bool,
    /// Output of `yt-dlp --version`, if the probe succeeded
    pub version: Option<String>,
}

impl ToolConfig {
    /// Config pointing at a bare command name on PATH, without probing
    pub fn system(bin: impl Into<PathBuf>) -> Self {
        Self {
            executable: bin.into(),
            using_system_path: true,
            version: None,
        }
    }

    /// Config pointing at a fixed executable path, without probing
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: path.into(),
            using_system_path: false,
            version: None,
        }
    }
}

/// Picks the yt-dlp executable and checks that it answers `--version`.
///
/// The local installation wins when the file exists; otherwise `system_bin` is
/// looked up through PATH. When the probe of the local binary fails the system
/// binary is tried, and if that fails too the system binary is used anyway so
/// that individual requests report the real error.
pub async fn probe_tool(local_path: &Path, system_bin: &str) -> ToolConfig {
    log::info!("Testing yt-dlp path: {}", local_path.display());
    let local_exists = local_path.is_file();
    log::info!("yt-dlp exists: {}", local_exists);

    if local_exists {
        match read_version(local_path).await {
            Ok(version) => {
                metrics::YTDLP_HEALTH_STATUS.set(1.0);
                return ToolConfig {
                    version: Some(version),
                    ..ToolConfig::local(local_path)
                };
            }
            Err(e) => log::error!("yt-dlp test failed for {}: {}", local_path.display(), e),
        }
    }

    match read_version(Path::new(system_bin)).await {
        Ok(version) => {
            metrics::YTDLP_HEALTH_STATUS.set(1.0);
            ToolConfig {
                version: Some(version),
                ..ToolConfig::system(system_bin)
            }
        }
        Err(e) => {
            metrics::YTDLP_HEALTH_STATUS.set(0.0);
            log::error!("yt-dlp setup failed: {}", e);
            log::warn!("Falling back to '{}' from PATH, downloads may not work properly", system_bin);
            ToolConfig::system(system_bin)
        }
    }
}

/// Probes using the configured local path and PATH binary
pub async fn probe_configured_tool() -> ToolConfig {
    probe_tool(Path::new(config::YTDLP_LOCAL_PATH.as_str()), config::YTDL_BIN.as_str()).await
}

/// Runs `<executable> --version` and returns the trimmed output
async fn read_version(executable: &Path) -> Result<String, AppError> {
    let started = Instant::now();
    let mut cmd = Command::new(executable);
    cmd.arg("--version");
    let result = run_with_timeout(&mut cmd, PROBE_TIMEOUT).await;

    let outcome = match &result {
        Ok(output) if output.status.success() => "success",
        _ => "failed",
    };
    metrics::record_invocation("probe", outcome, started.elapsed().as_secs_f64());

    let output = result?;
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || version.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(AppError::Internal(format!("yt-dlp not accessible: {}", stderr)));
    }
    log::info!("yt-dlp version: {}", version);
    Ok(version)
}

/// Arguments for the single-JSON metadata dump
pub fn metadata_args(platform: Platform) -> Vec<String> {
    let mut args = vec!["--dump-single-json".to_string(), "--no-playlist".to_string()];
    if platform.is_tiktok() {
        append_tiktok_extractor_args(&mut args);
    }
    args
}

/// Arguments for streaming the selected format to stdout
pub fn download_args(format: &FormatSelection, platform: Platform) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--format".to_string(),
        format.to_string(),
        "--output".to_string(),
        "-".to_string(),
        "--no-playlist".to_string(),
        "--no-check-certificates".to_string(),
        "--no-warnings".to_string(),
        "--prefer-free-formats".to_string(),
    ];
    push_header(&mut args, "referer:youtube.com");
    push_header(&mut args, &format!("user-agent:{}", config::ytdlp::DEFAULT_USER_AGENT));

    if platform.is_tiktok() {
        append_tiktok_extractor_args(&mut args);
        args.extend(
            ["--no-part", "--merge-output-format", "mp4", "--postprocessors", "merge"]
                .iter()
                .map(|s| s.to_string()),
        );
        push_header(&mut args, &format!("user-agent:{}", config::ytdlp::TIKTOK_USER_AGENT));
        push_header(&mut args, "referer:https://www.tiktok.com/");
        push_header(&mut args, &format!("accept:{}", config::ytdlp::TIKTOK_ACCEPT));
    }

    args
}

fn append_tiktok_extractor_args(args: &mut Vec<String>) {
    args.push("--extractor-args".to_string());
    args.push(config::ytdlp::TIKTOK_EXTRACTOR_ARGS.to_string());
    args.push("--force-generic-extractor".to_string());
}

fn push_header(args: &mut Vec<String>, header: &str) {
    args.push("--add-header".to_string());
    args.push(header.to_string());
}
