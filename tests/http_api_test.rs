//! HTTP API tests against the router with a scripted yt-dlp

mod common;

use std::time::Duration;

use axum::http::{header, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;

use common::*;
use dorarelay::download::{InvocationOutcome, Operation, ToolConfig};

#[tokio::test]
async fn test_info_projects_metadata() {
    let tool = FakeTool::new(vec![metadata(json!({
        "title": "My Video!",
        "duration": 125,
        "uploader": "Chan",
        "formats": null,
        "webpage_url": "https://www.youtube.com/watch?v=abc"
    }))]);
    let app = app_with(tool.clone());

    let response = app
        .oneshot(post_json("/info", json!({"url": "https://www.youtube.com/watch?v=abc"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "title": "My Video!",
            "duration": 125,
            "uploader": "Chan",
            "thumbnail": null,
            "description": null,
            "formats": 0
        })
    );

    let calls = tool.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "https://www.youtube.com/watch?v=abc");
    assert_eq!(calls[0].args, vec!["--dump-single-json", "--no-playlist"]);
}

#[tokio::test]
async fn test_info_validation() {
    let app = app_with(FakeTool::new(vec![]));

    let missing = app.clone().oneshot(post_json("/info", json!({}))).await.unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing).await, json!({"error": "URL is required."}));

    let unsupported = app
        .oneshot(post_json("/info", json!({"url": "https://vimeo.com/1"})))
        .await
        .unwrap();
    assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(unsupported).await,
        json!({"error": "Unsupported platform. We support YouTube, Facebook, Instagram, and TikTok."})
    );
}

#[tokio::test]
async fn test_info_empty_metadata() {
    let tool = FakeTool::new(vec![Step::Reply(InvocationOutcome::Success(bytes::Bytes::new()))]);
    let response = app_with(tool)
        .oneshot(post_json("/info", json!({"url": "https://youtu.be/abc"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({"error": "Could not fetch video information."}));
}

#[tokio::test]
async fn test_download_success_headers_and_body() {
    let tool = FakeTool::new(vec![metadata(json!({"title": "My Video!"})), media(b"\x00\x01MEDIA")]);
    let response = app_with(tool.clone())
        .oneshot(post_json("/download", json!({"url": "https://youtu.be/abc"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"My_Video.mp4\""
    );
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(body_bytes(response).await.as_ref(), b"\x00\x01MEDIA");

    let calls = tool.calls();
    assert_eq!(calls[0].operation, Operation::Metadata);
    assert_eq!(calls[1].operation, Operation::Download);
    // Default format token is "best"
    assert_eq!(calls[1].args[..2], ["--format".to_string(), "best".to_string()]);
}

#[tokio::test]
async fn test_download_tiktok_720() {
    let tool = FakeTool::new(vec![metadata(json!({"title": "dance"})), media(b"clip")]);
    let response = app_with(tool.clone())
        .oneshot(post_json(
            "/download",
            json!({"url": "https://www.tiktok.com/@user/video/7300000000000000000", "format": "720"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = tool.calls();
    assert_eq!(
        calls[0].args,
        vec![
            "--dump-single-json",
            "--no-playlist",
            "--extractor-args",
            "tiktok:api_hostname=api16-normal-c-useast1a.tiktokv.com",
            "--force-generic-extractor",
        ]
    );

    let args = &calls[1].args;
    assert_eq!(
        args[1],
        "best[height<=720][ext=mp4]/bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=480][ext=mp4]"
    );
    for flag in [
        "--extractor-args",
        "--force-generic-extractor",
        "--no-part",
        "--merge-output-format",
        "--postprocessors",
        "merge",
        "referer:https://www.tiktok.com/",
    ] {
        assert!(args.iter().any(|a| a == flag), "Missing {}", flag);
    }
}

#[tokio::test]
async fn test_download_missing_url() {
    let tool = FakeTool::new(vec![]);
    let response = app_with(tool.clone())
        .oneshot(post_json("/download", json!({"format": "720"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({"error": "URL is required."}));
    assert!(tool.calls().is_empty());
}

#[tokio::test]
async fn test_download_malformed_body() {
    let response = app_with(FakeTool::new(vec![]))
        .oneshot(post_json("/download", json!({"url": 42})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_download_cancelled_is_499() {
    let tool = FakeTool::new(vec![
        metadata(json!({"title": "x"})),
        Step::Reply(InvocationOutcome::Cancelled),
    ]);
    let response = app_with(tool)
        .oneshot(post_json("/download", json!({"url": "https://youtu.be/abc"})))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 499);
    assert_eq!(body_json(response).await, json!({"error": "Download cancelled by user"}));
}

#[tokio::test]
async fn test_client_disconnect_cancels_invocation() {
    let tool = FakeTool::new(vec![metadata(json!({"title": "x"})), Step::WaitForCancel]);
    let app = app_with(tool.clone());

    // Dropping the request future is what hyper does when the connection closes
    let request = app.oneshot(post_json("/download", json!({"url": "https://youtu.be/abc"})));
    assert!(tokio::time::timeout(Duration::from_millis(100), request).await.is_err());

    for _ in 0..100 {
        if tool.cancel_observed() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(tool.cancel_observed());
    assert_eq!(tool.calls().len(), 2);
}

#[tokio::test]
async fn test_download_failure_reports_stderr() {
    let tool = FakeTool::new(vec![metadata(json!({"title": "x"})), failed("network error", 1)]);
    let response = app_with(tool)
        .oneshot(post_json("/download", json!({"url": "https://youtu.be/abc", "format": "1080"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Download failed.", "details": "network error"})
    );
}

#[tokio::test]
async fn test_download_metadata_failure() {
    let tool = FakeTool::new(vec![failed("ERROR: Private video", 1)]);
    let response = app_with(tool.clone())
        .oneshot(post_json("/download", json!({"url": "https://www.instagram.com/reel/abc/"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Download failed.", "details": "ERROR: Private video"})
    );
    assert_eq!(tool.calls().len(), 1);
}

#[tokio::test]
async fn test_health_reports_tool() {
    let config = ToolConfig {
        version: Some("2025.01.15".to_string()),
        ..ToolConfig::local("/opt/yt-dlp")
    };
    let app = app_with(FakeTool::with_config(config, vec![]));

    for uri in ["/health", "/api/health"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["message"], "Backend is running");
        assert_eq!(body["resolvedExecutablePath"], "/opt/yt-dlp");
        assert_eq!(body["usingSystemPath"], false);
        assert_eq!(body["version"], "2025.01.15");
        assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
    }
}

#[tokio::test]
async fn test_api_prefix_routes() {
    let tool = FakeTool::new(vec![metadata(json!({"title": "t"}))]);
    let response = app_with(tool)
        .oneshot(post_json("/api/info", json!({"url": "https://fb.watch/abc"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    // Registers the gauge so the exposition is never empty
    dorarelay::core::metrics::YTDLP_HEALTH_STATUS.get();
    let response = app_with(FakeTool::new(vec![])).oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
    assert!(text.contains("dorarelay_"));
}
