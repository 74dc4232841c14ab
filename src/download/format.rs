//! Format resolution: quality/codec token → yt-dlp format-selection expression.
//!
//! Resolution is an ordered table of `(tokens, expression)` rules. The token is
//! lowercased and matched by substring, top to bottom; the first rule with any
//! matching token wins and nothing is combined. Each table ends in a fixed
//! fallback chain.

use std::fmt;

use crate::download::platform::Platform;

/// A yt-dlp format-selection expression such as `best[height<=720]/best`.
///
/// Alternatives are separated by `/` and ordered by preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelection(String);

impl FormatSelection {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Individual fallback alternatives, most preferred first
    pub fn alternatives(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for FormatSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of a resolution table
#[derive(Debug)]
pub struct FormatRule {
    /// Any of these substrings selects the rule
    pub tokens: &'static [&'static str],
    /// Expression emitted when the rule matches
    pub expression: &'static str,
}

impl FormatRule {
    fn matches(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| token.contains(t))
    }
}

/// Tokens that request an audio-only download
pub const AUDIO_TOKENS: &[&str] = &["mp3", "aac", "m4a", "ogg", "wav", "flac", "audio"];

/// Table for YouTube, Facebook and Instagram
pub const STANDARD_RULES: &[FormatRule] = &[
    FormatRule { tokens: &["1080", "4k"], expression: "best[height<=1080]/best[height<=720]/best" },
    FormatRule { tokens: &["720"], expression: "best[height<=720]/best[height<=480]/best" },
    FormatRule { tokens: &["480"], expression: "best[height<=480]/best[height<=360]/best" },
    FormatRule { tokens: &["360"], expression: "best[height<=360]/best[height<=240]/best" },
    FormatRule { tokens: &["240"], expression: "best[height<=240]/worst" },
    FormatRule { tokens: &["mp3", "audio"], expression: "bestaudio[ext=mp3]/bestaudio/best" },
    FormatRule { tokens: &["aac"], expression: "bestaudio[ext=aac]/bestaudio/best" },
    FormatRule { tokens: &["m4a"], expression: "bestaudio[ext=m4a]/bestaudio/best" },
    FormatRule { tokens: &["ogg"], expression: "bestaudio[ext=ogg]/bestaudio/best" },
    FormatRule { tokens: &["wav"], expression: "bestaudio[ext=wav]/bestaudio/best" },
    FormatRule { tokens: &["flac"], expression: "bestaudio[ext=flac]/bestaudio/best" },
    FormatRule { tokens: &["avi"], expression: "best[ext=avi]/best" },
    FormatRule { tokens: &["mov"], expression: "best[ext=mov]/best" },
    FormatRule { tokens: &["mkv"], expression: "best[ext=mkv]/best" },
    FormatRule { tokens: &["webm"], expression: "best[ext=webm]/best" },
    FormatRule { tokens: &["flv"], expression: "best[ext=flv]/best" },
    FormatRule { tokens: &["wmv"], expression: "best[ext=wmv]/best" },
    FormatRule { tokens: &["worst"], expression: "worst" },
    // Unreachable through substring matching ("audio" above wins) but kept in order
    FormatRule { tokens: &["audio-only"], expression: "bestaudio/best" },
    FormatRule { tokens: &["video-only"], expression: "bestvideo/best" },
    FormatRule { tokens: &["best"], expression: "best" },
];

/// Fallback for the standard table
pub const STANDARD_DEFAULT: &str = "best[height<=1080]/best[height<=720]/best[height<=480]/best";

/// Table for TikTok. Every height cap is pinned to mp4 and offers a merged
/// video+audio alternative before dropping a tier.
pub const TIKTOK_RULES: &[FormatRule] = &[
    FormatRule { tokens: AUDIO_TOKENS, expression: "bestaudio[ext=mp3]/bestaudio/best" },
    FormatRule {
        tokens: &["1080", "4k"],
        expression: "best[height<=1080][ext=mp4]/bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]",
    },
    FormatRule {
        tokens: &["720"],
        expression: "best[height<=720][ext=mp4]/bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=480][ext=mp4]",
    },
    FormatRule {
        tokens: &["480"],
        expression: "best[height<=480][ext=mp4]/bestvideo[height<=480][ext=mp4]+bestaudio[ext=m4a]/best[height<=360][ext=mp4]",
    },
    FormatRule {
        tokens: &["360"],
        expression: "best[height<=360][ext=mp4]/bestvideo[height<=360][ext=mp4]+bestaudio[ext=m4a]/best[height<=240][ext=mp4]",
    },
    FormatRule {
        tokens: &["240"],
        expression: "best[height<=240][ext=mp4]/bestvideo[height<=240][ext=mp4]+bestaudio[ext=m4a]/worst[ext=mp4]",
    },
];

/// Fallback for the TikTok table
pub const TIKTOK_DEFAULT: &str =
    "best[ext=mp4]/best[height<=720][ext=mp4]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[height<=480][ext=mp4]";

/// Rule table and fallback for a platform
pub fn rules_for(platform: Platform) -> (&'static [FormatRule], &'static str) {
    match platform {
        Platform::TikTok => (TIKTOK_RULES, TIKTOK_DEFAULT),
        Platform::Standard => (STANDARD_RULES, STANDARD_DEFAULT),
    }
}

/// Resolves a requested format token into a format-selection expression.
///
/// Pure and total: the same `(token, platform)` always yields the same expression
/// and yt-dlp is never consulted.
///
/// # Examples
/// ```
/// use dorarelay::download::format::resolve;
/// use dorarelay::download::platform::Platform;
///
/// assert_eq!(resolve("720", Platform::Standard).as_str(), "best[height<=720]/best[height<=480]/best");
/// assert_eq!(resolve("1080-mp3", Platform::Standard).as_str(), "best[height<=1080]/best[height<=720]/best");
/// ```
pub fn resolve(format_token: &str, platform: Platform) -> FormatSelection {
    let token = format_token.trim().to_ascii_lowercase();
    let (rules, fallback) = rules_for(platform);
    let expression = rules
        .iter()
        .find(|rule| rule.matches(&token))
        .map_or(fallback, |rule| rule.expression);
    FormatSelection(expression.to_string())
}
