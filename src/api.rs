use crate::error::{ClientError, Result};
use crate::model::{ConversionResult, DownloadRequest, HealthReport, UploadCandidate, VideoMetadata};
use crate::progress::DownloadJobState;
use futures::StreamExt;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// Characters left alone by a browser's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(segment: &str) -> String {
    utf8_percent_encode(segment, COMPONENT).to_string()
}

pub fn download_file_path(filename: &str) -> String {
    format!("/api/download-file/{}", encode_component(filename))
}

#[derive(Deserialize)]
struct VideoInfoBody {
    info: VideoMetadata,
}

#[derive(Deserialize)]
struct DownloadBody {
    filename: String,
}

#[derive(Deserialize)]
struct CleanupBody {
    #[serde(default)]
    message: Option<String>,
}

/// Thin client over the download and converter backends. Both live on the same origin.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.base_url, path)
    }

    pub async fn video_info(&self, url: &str) -> Result<VideoMetadata> {
        let resp = self
            .http
            .post(self.url("/api/video-info"))
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;
        let body: VideoInfoBody =
            read_envelope(resp, "Failed to retrieve video information").await?;
        Ok(body.info)
    }

    /// Blocks until the server has finished the job and returns the produced filename.
    pub async fn download(&self, request: &DownloadRequest) -> Result<String> {
        let resp = self
            .http
            .post(self.url("/api/download"))
            .json(request)
            .send()
            .await?;
        let body: DownloadBody = read_envelope(resp, "Download failed").await?;
        Ok(body.filename)
    }

    pub async fn progress(&self) -> Result<DownloadJobState> {
        let resp = self.http.get(self.url("/api/progress")).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Server(format!("progress endpoint returned {}", status)));
        }
        Ok(resp.json().await?)
    }

    /// Sends the multipart upload. The server converts before answering, so this
    /// resolves only once conversion is over; decode with [`upload_result`].
    pub async fn send_upload(&self, candidate: &UploadCandidate) -> Result<reqwest::Response> {
        let file = File::open(&candidate.file.path).await?;
        let mime = mime_guess::from_path(&candidate.file.name).first_or_octet_stream();
        let part = Part::stream_with_length(
            reqwest::Body::wrap_stream(ReaderStream::new(file)),
            candidate.file.size_bytes,
        )
        .file_name(candidate.file.name.clone())
        .mime_str(mime.as_ref())?;

        let form = Form::new()
            .part("file", part)
            .text("quality", candidate.quality.as_str());

        info!(
            "Uploading {} ({} bytes, quality {})",
            candidate.file.name, candidate.file.size_bytes, candidate.quality
        );
        Ok(self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?)
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let resp = self.http.get(self.url("/health")).send().await?;
        Ok(resp.json().await?)
    }

    pub async fn cleanup(&self) -> Result<String> {
        let resp = self.http.post(self.url("/cleanup")).send().await?;
        let body: CleanupBody = read_envelope(resp, "Cleanup failed").await?;
        Ok(body.message.unwrap_or_else(|| "Cleanup completed".to_string()))
    }

    /// Streams `path` (relative to the server root) into `dir/filename`.
    pub async fn save_file(&self, path: &str, dir: &Path, filename: &str) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| ClientError::Validation(format!("Invalid filename: {}", filename)))?;
        if !dir.exists() {
            info!("Creating download directory: {:?}", dir);
            tokio::fs::create_dir_all(dir).await?;
        }
        let dest = dir.join(name);

        debug!("Fetching {} into {:?}", path, dest);
        let resp = self.http.get(self.url(path)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Server(format!(
                "Could not fetch {}: status {}",
                filename, status
            )));
        }

        let mut file = File::create(&dest).await?;
        let mut stream = resp.bytes_stream();
        while let Some(item) = stream.next().await {
            file.write_all(&item?).await?;
        }
        file.flush().await?;

        info!("Saved {:?}", dest);
        Ok(dest)
    }
}

pub async fn upload_result(resp: reqwest::Response) -> Result<ConversionResult> {
    read_envelope(resp, "Conversion failed").await
}

/// Decodes the `{success, error, ...}` envelope shared by the JSON endpoints.
/// Non-2xx, `success != true`, and undecodable bodies all become `Server` errors
/// carrying the server's `error` text when there is one.
async fn read_envelope<T: DeserializeOwned>(resp: reqwest::Response, fallback: &str) -> Result<T> {
    let status = resp.status();
    let bytes = resp.bytes().await?;

    let value: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(v) => v,
        Err(e) => {
            debug!("Undecodable response body (status {}): {}", status, e);
            return Err(ClientError::Server(fallback.to_string()));
        }
    };

    let succeeded = value.get("success").and_then(|v| v.as_bool()) == Some(true);
    if !status.is_success() || !succeeded {
        let message = value
            .get("error")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback);
        return Err(ClientError::Server(message.to_string()));
    }

    serde_json::from_value(value).map_err(|e| {
        debug!("Unexpected response shape: {}", e);
        ClientError::Server(fallback.to_string())
    })
}
