//! URL and filename validation utilities
//!
//! Provides the input checks that run before any yt-dlp process is spawned:
//! - Platform allow-list check for submitted URLs
//! - Title sanitization for the `Content-Disposition` filename
//!
//! Neither check can fail: the gate degrades to `false`, the sanitizer to `""`.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::core::error::AppError;

/// Hostname fragments accepted by the relay
pub const SUPPORTED_PLATFORMS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "facebook.com",
    "fb.watch",
    "instagram.com",
    "tiktok.com",
];

/// Hostname fragment identifying TikTok, which needs its own format table and headers
pub const TIKTOK_DOMAIN: &str = "tiktok.com";

/// Maximum length of a sanitized title
pub const MAX_TITLE_LEN: usize = 50;

static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").expect("disallowed chars regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static HYPHEN_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("hyphen regex"));

/// Validation errors, displayed verbatim to the client
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No URL in the request body
    #[error("URL is required.")]
    MissingUrl,

    /// URL is malformed or its host is not on the allow-list
    #[error("Unsupported platform. We support YouTube, Facebook, Instagram, and TikTok.")]
    UnsupportedPlatform,

    /// Request body could not be decoded
    #[error("Invalid request body: {0}")]
    MalformedBody(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Returns true if the URL's hostname contains one of the supported platform domains.
///
/// Malformed, scheme-less and protocol-relative inputs yield `false`.
///
/// # Examples
/// ```
/// use dorarelay::core::validation::is_supported_url;
///
/// assert!(is_supported_url("https://www.youtube.com/watch?v=abc"));
/// assert!(is_supported_url("https://vm.tiktok.com/ZM123/"));
/// assert!(!is_supported_url("https://vimeo.com/123"));
/// assert!(!is_supported_url("youtube.com/watch?v=abc"));
/// assert!(!is_supported_url("//youtube.com/watch?v=abc"));
/// ```
pub fn is_supported_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    SUPPORTED_PLATFORMS.iter().any(|domain| host.contains(domain))
}

/// Checks an optional URL from a request body and returns it trimmed.
///
/// An empty string counts as missing.
pub fn require_supported_url(url: Option<&str>) -> Result<&str, ValidationError> {
    let url = url.map(str::trim).filter(|u| !u.is_empty()).ok_or(ValidationError::MissingUrl)?;
    if !is_supported_url(url) {
        return Err(ValidationError::UnsupportedPlatform);
    }
    Ok(url)
}

/// Turns a media title into a filename fragment.
///
/// Strips everything except ASCII word characters, whitespace and hyphens, turns
/// whitespace runs into `_`, squeezes hyphen runs, then truncates to 50 characters.
/// The result may be empty; callers pick their own fallback stem.
///
/// # Examples
/// ```
/// use dorarelay::core::validation::sanitize_title;
///
/// assert_eq!(sanitize_title("My Video!"), "My_Video");
/// assert_eq!(sanitize_title("a -- b"), "a_-_b");
/// assert_eq!(sanitize_title("!!!"), "");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let stripped = DISALLOWED_CHARS.replace_all(title, "");
    let underscored = WHITESPACE_RUN.replace_all(&stripped, "_");
    let squeezed = HYPHEN_RUN.replace_all(&underscored, "-");
    let truncated: String = squeezed.chars().take(MAX_TITLE_LEN).collect();
    truncated.trim().to_string()
}
