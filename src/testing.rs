//! In-process stand-in for the download and converter backends.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::{StatusCode, Uri},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedUpload {
    pub file_name: String,
    pub bytes: usize,
    pub quality: String,
}

#[derive(Clone)]
pub struct StubBackend {
    pub info_hits: Arc<AtomicUsize>,
    pub progress_hits: Arc<AtomicUsize>,
    pub progress_fails: Arc<AtomicBool>,
    pub download_delay_ms: Arc<AtomicU64>,
    pub progress_delay_ms: Arc<AtomicU64>,
    pub download_filename: Arc<Mutex<String>>,
    pub download_bodies: Arc<Mutex<Vec<Value>>>,
    pub file_requests: Arc<Mutex<Vec<String>>>,
    pub uploads: Arc<Mutex<Vec<RecordedUpload>>>,
    pub upload_error: Arc<Mutex<Option<String>>>,
    pub ffmpeg_available: Arc<AtomicBool>,
    pub cleanup_hits: Arc<AtomicUsize>,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self {
            info_hits: Arc::new(AtomicUsize::new(0)),
            progress_hits: Arc::new(AtomicUsize::new(0)),
            progress_fails: Arc::new(AtomicBool::new(false)),
            download_delay_ms: Arc::new(AtomicU64::new(0)),
            progress_delay_ms: Arc::new(AtomicU64::new(0)),
            download_filename: Arc::new(Mutex::new("clip.mp4".to_string())),
            download_bodies: Arc::new(Mutex::new(Vec::new())),
            file_requests: Arc::new(Mutex::new(Vec::new())),
            uploads: Arc::new(Mutex::new(Vec::new())),
            upload_error: Arc::new(Mutex::new(None)),
            ffmpeg_available: Arc::new(AtomicBool::new(true)),
            cleanup_hits: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Serves the stub on an ephemeral local port and returns its base URL.
pub async fn spawn_stub(stub: StubBackend) -> String {
    let app = Router::new()
        .route("/api/video-info", post(video_info))
        .route("/api/download", post(download))
        .route("/api/progress", get(progress))
        .route("/api/download-file/{filename}", get(serve_file))
        .route("/upload", post(upload))
        .route("/download/{filename}", get(serve_file))
        .route("/health", get(health))
        .route("/cleanup", post(cleanup))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn video_info(State(stub): State<StubBackend>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    stub.info_hits.fetch_add(1, Ordering::SeqCst);
    let url = body.get("url").and_then(|v| v.as_str()).unwrap_or_default();
    if url.contains("unavailable") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Video unavailable" })),
        );
    }
    if url.contains("garbled") {
        return (StatusCode::OK, Json(json!({ "success": false })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "info": {
                "thumbnail": "https://i.ytimg.com/vi/abc/hq.jpg",
                "title": "Never Gonna Give You Up",
                "uploader": "Rick Astley",
                "duration": 212.48,
                "view_count": 1_234_567
            }
        })),
    )
}

async fn download(State(stub): State<StubBackend>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    stub.download_bodies.lock().unwrap().push(body.clone());
    let delay = stub.download_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let url = body.get("url").and_then(|v| v.as_str()).unwrap_or_default();
    if url.contains("unsupported") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Unsupported URL" })),
        );
    }
    let filename = stub.download_filename.lock().unwrap().clone();
    (
        StatusCode::OK,
        Json(json!({ "success": true, "filename": filename })),
    )
}

async fn progress(State(stub): State<StubBackend>) -> (StatusCode, Json<Value>) {
    stub.progress_hits.fetch_add(1, Ordering::SeqCst);
    let delay = stub.progress_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if stub.progress_fails.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "downloader unavailable" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "status": "downloading",
            "percentage": 42.37,
            "speed": "1.20 MB/s",
            "downloaded": "10.5 MB",
            "total": "24.8 MB",
            "eta": "12s"
        })),
    )
}

async fn serve_file(State(stub): State<StubBackend>, uri: Uri) -> &'static str {
    stub.file_requests.lock().unwrap().push(uri.path().to_string());
    "media-bytes"
}

async fn upload(State(stub): State<StubBackend>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    let mut recorded = RecordedUpload {
        file_name: String::new(),
        bytes: 0,
        quality: String::new(),
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            recorded.file_name = field.file_name().unwrap_or_default().to_string();
            recorded.bytes = field.bytes().await.unwrap().len();
        } else if name == "quality" {
            recorded.quality = field.text().await.unwrap();
        }
    }
    stub.uploads.lock().unwrap().push(recorded.clone());

    if let Some(error) = stub.upload_error.lock().unwrap().clone() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": error })),
        );
    }

    let stem = recorded.file_name.rsplit_once('.').map(|(s, _)| s).unwrap_or("out");
    let filename = format!("0f3a_{}.mp4", stem);
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Successfully converted to MP4",
            "download_url": format!("/download/{}", filename),
            "filename": filename
        })),
    )
}

async fn health(State(stub): State<StubBackend>) -> Json<Value> {
    let available = stub.ffmpeg_available.load(Ordering::SeqCst);
    Json(json!({
        "status": if available { "healthy" } else { "degraded" },
        "ffmpeg_available": available,
        "message": if available { "FFmpeg is available" } else { "FFmpeg is not installed" }
    }))
}

async fn cleanup(State(stub): State<StubBackend>) -> Json<Value> {
    stub.cleanup_hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "success": true, "message": "Cleanup completed" }))
}
