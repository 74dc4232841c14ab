//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - yt-dlp configuration banner printed once the startup probe finished

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;
use crate::download::ytdlp::ToolConfig;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger was already set
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the resolved yt-dlp setup at application startup
pub fn log_tool_configuration(tool: &ToolConfig) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("yt-dlp configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Local install path: {}", config::YTDLP_LOCAL_PATH.as_str());
    log::info!("Resolved executable: {}", tool.executable.display());
    log::info!("Using system PATH: {}", tool.using_system_path);

    match &tool.version {
        Some(version) => log::info!("yt-dlp version: {}", version),
        None => {
            log::warn!("yt-dlp did not answer --version, downloads may not work properly");
            log::warn!("Install it with: pip install -U yt-dlp");
        }
    }

    match *config::YTDLP_TIMEOUT {
        Some(limit) => log::info!("Invocation ceiling: {}s", limit.as_secs()),
        None => log::info!("Invocation ceiling: none (bounded by client connection)"),
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
