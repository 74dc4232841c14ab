//! Target platform detection.
//!
//! Only TikTok gets special treatment (separate format table, extractor args and
//! headers); every other supported site shares the standard path.

use crate::core::validation::TIKTOK_DOMAIN;

/// Platform family a request is routed through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// TikTok: audio and video tracks are frequently delivered separately
    TikTok,
    /// YouTube, Facebook, Instagram
    Standard,
}

impl Platform {
    /// Detects the platform from the URL, honouring an explicit `platform` hint from the client.
    pub fn detect(url: &str, hint: Option<&str>) -> Self {
        let hinted = hint.is_some_and(|h| h.trim().eq_ignore_ascii_case("tiktok"));
        if hinted || url.contains(TIKTOK_DOMAIN) {
            Platform::TikTok
        } else {
            Platform::Standard
        }
    }

    pub fn is_tiktok(self) -> bool {
        self == Platform::TikTok
    }
}
