//! Prometheus metrics for the relay
//!
//! Tracks:
//! - Download outcomes by platform (completed / cancelled / failed / rejected)
//! - yt-dlp invocation duration by operation
//! - yt-dlp health as seen by the startup probe

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Gauge, HistogramVec};

lazy_static! {
    /// Finished /download requests
    /// Labels: outcome (completed/cancelled/failed/rejected), platform (tiktok/standard)
    pub static ref DOWNLOADS_TOTAL: CounterVec = register_counter_vec!(
        "dorarelay_downloads_total",
        "Total number of download requests by outcome",
        &["outcome", "platform"]
    )
    .unwrap();

    /// Finished /info requests
    /// Labels: outcome (completed/failed/rejected)
    pub static ref INFO_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "dorarelay_info_requests_total",
        "Total number of metadata requests by outcome",
        &["outcome"]
    )
    .unwrap();

    /// yt-dlp command execution duration
    /// Labels: operation (metadata/download/probe), outcome (success/cancelled/failed)
    pub static ref YTDLP_EXECUTION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "dorarelay_ytdlp_execution_duration_seconds",
        "Time spent executing yt-dlp commands",
        &["operation", "outcome"],
        vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]
    )
    .unwrap();

    /// yt-dlp health status (1 = answered --version at startup, 0 = did not)
    pub static ref YTDLP_HEALTH_STATUS: Gauge = register_gauge!(
        "dorarelay_ytdlp_health_status",
        "yt-dlp health status (1 = healthy, 0 = unhealthy)"
    )
    .unwrap();
}

/// Platform label used on download metrics
pub fn platform_label(is_tiktok: bool) -> &'static str {
    if is_tiktok {
        "tiktok"
    } else {
        "standard"
    }
}

/// Records a finished download request
pub fn record_download(outcome: &str, is_tiktok: bool) {
    DOWNLOADS_TOTAL
        .with_label_values(&[outcome, platform_label(is_tiktok)])
        .inc();
}

/// Records a finished info request
pub fn record_info(outcome: &str) {
    INFO_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Records how long one yt-dlp invocation took
pub fn record_invocation(operation: &str, outcome: &str, seconds: f64) {
    YTDLP_EXECUTION_DURATION_SECONDS
        .with_label_values(&[operation, outcome])
        .observe(seconds);
}
