use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use dorarelay::cli::{Cli, Commands};
use dorarelay::core::web_server::{self, AppState};
use dorarelay::core::{config, init_logger, log_tool_configuration};
use dorarelay::download::metadata::MediaMetadata;
use dorarelay::download::orchestrator::InfoRequest;
use dorarelay::download::ytdlp::{self as ytdlp, ToolConfig};
use dorarelay::download::{DownloadOrchestrator, YtDlpInvoker};

/// Main entry point for the relay
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, bind address, server).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present, before any config is read
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Serve { port }) => run_server(port).await,
        Some(Commands::Info { url, json }) => run_cli_info(url, json).await,
        Some(Commands::Probe) => run_probe().await,
        None => {
            log::info!("No command specified, running server");
            run_server(None).await
        }
    }
}

/// Probe yt-dlp once and wire it into the orchestrator
async fn build_orchestrator() -> (Arc<ToolConfig>, DownloadOrchestrator) {
    let tool = Arc::new(ytdlp::probe_configured_tool().await);
    log_tool_configuration(&tool);
    let invoker = YtDlpInvoker::new(Arc::clone(&tool)).with_timeout(*config::YTDLP_TIMEOUT);
    (tool, DownloadOrchestrator::new(Arc::new(invoker)))
}

async fn run_server(port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(*config::server::PORT);
    let addr: SocketAddr = format!("{}:{}", config::server::BIND_ADDR.as_str(), port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}:{}: {}", config::server::BIND_ADDR.as_str(), port, e))?;

    let (_, orchestrator) = build_orchestrator().await;
    web_server::start_server(addr, AppState::new(orchestrator)).await
}

async fn run_cli_info(url: String, json: bool) -> Result<()> {
    let (_, orchestrator) = build_orchestrator().await;
    let info = orchestrator
        .fetch_info(InfoRequest { url: Some(url) }, CancellationToken::new())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print_info_summary(&info);
    }
    Ok(())
}

async fn run_probe() -> Result<()> {
    let (tool, _) = build_orchestrator().await;
    println!("Executable: {}", tool.executable.display());
    println!("Using system PATH: {}", tool.using_system_path);
    match &tool.version {
        Some(version) => println!("Version: {}", version),
        None => {
            println!("Version: unavailable");
            return Err(anyhow::anyhow!("yt-dlp did not answer --version"));
        }
    }
    Ok(())
}

fn print_info_summary(info: &MediaMetadata) {
    println!("Title: {}", info.title);
    println!("Uploader: {}", info.uploader);
    match info.duration.as_ref().and_then(|d| d.as_f64()) {
        Some(secs) => println!("Duration: {}", format_duration(secs as u64)),
        None => println!("Duration: unknown"),
    }
    println!("Formats: {}", info.formats);
    if let Some(thumbnail) = &info.thumbnail {
        println!("Thumbnail: {}", thumbnail);
    }
    if let Some(description) = &info.description {
        println!("Description: {}", description);
    }
}

/// Format seconds as MM:SS or H:MM:SS.
fn format_duration(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
