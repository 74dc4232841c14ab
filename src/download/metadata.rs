//! Metadata projection from yt-dlp's `--dump-single-json` document.
//!
//! Only a handful of fields are read; the raw document (which can run to
//! megabytes with all format entries) is never forwarded to the client.

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Maximum number of description characters kept in the excerpt
pub const DESCRIPTION_EXCERPT_CHARS: usize = 200;

/// The subset of yt-dlp's info document the relay reads
#[derive(Debug, Default, Deserialize)]
pub struct RawVideoInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub fulltitle: Option<String>,
    #[serde(default)]
    pub duration: Option<Number>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub formats: Option<Vec<serde_json::Value>>,
}

impl RawVideoInfo {
    /// Parses the tool's stdout
    pub fn parse(stdout: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(stdout)
    }

    /// Title used for the download filename. Falls back like the projection does.
    pub fn display_title(&self) -> &str {
        non_empty(self.title.as_deref())
            .or_else(|| non_empty(self.fulltitle.as_deref()))
            .unwrap_or("Unknown Title")
    }
}

/// Size-bounded view of a video's metadata returned by `/info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    /// Seconds; null when absent or zero
    pub duration: Option<Number>,
    pub uploader: String,
    pub thumbnail: Option<String>,
    /// First 200 characters followed by "..."
    pub description: Option<String>,
    /// Number of formats yt-dlp listed; 0 when the list is absent
    pub formats: usize,
}

impl From<&RawVideoInfo> for MediaMetadata {
    fn from(info: &RawVideoInfo) -> Self {
        Self {
            title: info.display_title().to_string(),
            duration: info.duration.clone().filter(|d| d.as_f64().is_some_and(|v| v != 0.0)),
            uploader: non_empty(info.uploader.as_deref())
                .or_else(|| non_empty(info.channel.as_deref()))
                .unwrap_or("Unknown")
                .to_string(),
            thumbnail: non_empty(info.thumbnail.as_deref()).map(str::to_string),
            description: non_empty(info.description.as_deref()).map(description_excerpt),
            formats: info.formats.as_ref().map_or(0, Vec::len),
        }
    }
}

/// Cuts a description to [`DESCRIPTION_EXCERPT_CHARS`] characters and appends "..."
pub fn description_excerpt(description: &str) -> String {
    let mut excerpt: String = description.chars().take(DESCRIPTION_EXCERPT_CHARS).collect();
    excerpt.push_str("...");
    excerpt
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
