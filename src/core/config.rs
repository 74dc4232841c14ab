//! Configuration constants for the relay.
//!
//! Every value is read once from the environment on first access. `main` loads
//! `.env` through dotenvy before anything here is touched.

use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Preferred local yt-dlp installation.
/// Read from YTDLP_LOCAL_PATH environment variable, tilde is expanded.
/// If the file exists at startup probing time it wins over the PATH lookup.
/// Default: ~/.local/bin/yt-dlp
pub static YTDLP_LOCAL_PATH: Lazy<String> = Lazy::new(|| {
    let raw = env::var("YTDLP_LOCAL_PATH").unwrap_or_else(|_| "~/.local/bin/yt-dlp".to_string());
    shellexpand::tilde(&raw).to_string()
});

/// yt-dlp binary name looked up through PATH when the local install is absent.
/// Read from YTDL_BIN environment variable, defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Optional ceiling for a single yt-dlp invocation.
/// Read from YTDLP_TIMEOUT_SECS environment variable.
/// Unset (or 0) means a request with an open client connection may run indefinitely.
pub static YTDLP_TIMEOUT: Lazy<Option<Duration>> = Lazy::new(|| {
    env::var("YTDLP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: dorarelay.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "dorarelay.log".to_string()));

/// Origins allowed to call the API from a browser.
/// Read from CORS_ALLOWED_ORIGINS environment variable (comma separated)
pub static CORS_ALLOWED_ORIGINS: Lazy<Vec<String>> = Lazy::new(|| {
    env::var("CORS_ALLOWED_ORIGINS")
        .map(|v| parse_origin_list(&v))
        .unwrap_or_else(|_| server::DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect())
});

/// HTTP server configuration
pub mod server {
    use once_cell::sync::Lazy;
    use std::env;

    /// Port used when PORT is not set
    pub const DEFAULT_PORT: u16 = 4000;

    /// Frontend dev servers allowed by default
    pub const DEFAULT_ORIGINS: &[&str] = &[
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    /// Default request body limit (10 MiB)
    pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

    /// Listening port
    /// Read from PORT environment variable
    pub static PORT: Lazy<u16> = Lazy::new(|| {
        env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT)
    });

    /// Bind address
    /// Read from BIND_ADDR environment variable
    /// Default: 0.0.0.0
    pub static BIND_ADDR: Lazy<String> =
        Lazy::new(|| env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()));

    /// Maximum accepted JSON body size
    /// Read from MAX_BODY_BYTES environment variable
    pub static MAX_BODY_BYTES: Lazy<usize> = Lazy::new(|| {
        env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_BODY_BYTES)
    });
}

/// yt-dlp request configuration
pub mod ytdlp {
    /// Extractor arguments required for TikTok
    pub const TIKTOK_EXTRACTOR_ARGS: &str = "tiktok:api_hostname=api16-normal-c-useast1a.tiktokv.com";

    /// Browser user agent sent on every download
    pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

    /// Newer user agent appended for TikTok downloads
    pub const TIKTOK_USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    /// Accept header for TikTok downloads
    pub const TIKTOK_ACCEPT: &str =
        "video/webm,video/ogg,video/*;q=0.9,application/ogg;q=0.7,audio/*;q=0.6,*/*;q=0.5";

    /// Filename stem used when a title sanitizes to nothing
    pub const DEFAULT_FILENAME_STEM: &str = "download";

    /// Extension attached to every download
    pub const DOWNLOAD_EXTENSION: &str = "mp4";
}

/// Splits a comma separated origin list, dropping blanks.
pub fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
