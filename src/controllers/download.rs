use crate::api::{self, ApiClient};
use crate::config::Settings;
use crate::controllers::{ButtonState, InFlight};
use crate::error::{ClientError, Result};
use crate::model::{DownloadRequest, MediaType, VideoMetadata};
use crate::poller::ProgressPoller;
use crate::progress::DownloadJobState;
use crate::status::{BannerKind, StatusPresenter};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio_util::sync::DropGuard;
use tracing::{error, info};

const INFO_LABEL: &str = "Get Video Info";
const DOWNLOAD_LABEL: &str = "Download";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    Downloading,
}

/// Everything the download page shows, as plain data.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadView {
    pub media_type: MediaType,
    pub video_quality: String,
    pub audio_quality: String,
    pub info_button: ButtonState,
    pub info_panel: Option<VideoMetadata>,
    pub submit_button: ButtonState,
    pub progress_visible: bool,
    pub progress: DownloadJobState,
    pub saved_file: Option<PathBuf>,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            media_type: MediaType::Video,
            video_quality: MediaType::Video.default_quality().to_string(),
            audio_quality: MediaType::Audio.default_quality().to_string(),
            info_button: ButtonState::ready(INFO_LABEL),
            info_panel: None,
            submit_button: ButtonState::ready(DOWNLOAD_LABEL),
            progress_visible: false,
            progress: DownloadJobState::baseline(),
            saved_file: None,
        }
    }
}

impl DownloadView {
    pub fn video_quality_visible(&self) -> bool {
        self.media_type == MediaType::Video
    }

    pub fn audio_quality_visible(&self) -> bool {
        self.media_type == MediaType::Audio
    }

    /// Value of whichever quality selector is showing.
    pub fn active_quality(&self) -> &str {
        match self.media_type {
            MediaType::Video => &self.video_quality,
            MediaType::Audio => &self.audio_quality,
        }
    }
}

// Held for the lifetime of one download. If the operation is dropped midway,
// polling is cancelled and the submit button comes back.
struct Teardown<'a> {
    view: &'a watch::Sender<DownloadView>,
    _polling: DropGuard,
}

impl Drop for Teardown<'_> {
    fn drop(&mut self) {
        self.view.send_if_modified(|v| {
            let stuck = !v.submit_button.enabled;
            if stuck {
                v.submit_button = ButtonState::ready(DOWNLOAD_LABEL);
            }
            stuck
        });
    }
}

pub struct DownloadController {
    api: ApiClient,
    view: Arc<watch::Sender<DownloadView>>,
    status: StatusPresenter,
    poller: ProgressPoller,
    downloading: AtomicBool,
    download_dir: PathBuf,
}

impl DownloadController {
    pub fn new(settings: &Settings) -> Self {
        let api = ApiClient::new(&settings.server_url);
        let (view, _) = watch::channel(DownloadView::default());
        Self {
            poller: ProgressPoller::new(api.clone(), settings.poll_interval()),
            api,
            view: Arc::new(view),
            status: StatusPresenter::new(settings.success_dismiss()),
            downloading: AtomicBool::new(false),
            download_dir: settings.download_dir.clone(),
        }
    }

    pub fn view(&self) -> DownloadView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DownloadView> {
        self.view.subscribe()
    }

    pub fn status(&self) -> &StatusPresenter {
        &self.status
    }

    pub fn state(&self) -> OperationState {
        if self.downloading.load(Ordering::SeqCst) {
            OperationState::Downloading
        } else {
            OperationState::Idle
        }
    }

    pub async fn is_polling(&self) -> bool {
        self.poller.is_running().await
    }

    pub fn set_media_type(&self, media_type: MediaType) {
        self.view.send_modify(|v| v.media_type = media_type);
    }

    /// Sets the visible selector's value. It must be one of the active media type's options.
    pub fn select_quality(&self, quality: &str) -> Result<()> {
        let media_type = self.view.borrow().media_type;
        if !media_type.accepts_quality(quality) {
            return self.fail(ClientError::Validation(format!(
                "Unknown {:?} quality: {}",
                media_type, quality
            )));
        }
        self.view.send_modify(|v| match media_type {
            MediaType::Video => v.video_quality = quality.to_string(),
            MediaType::Audio => v.audio_quality = quality.to_string(),
        });
        Ok(())
    }

    pub async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata> {
        let url = url.trim();
        if url.is_empty() {
            return self.fail(ClientError::Validation("Please enter a video URL".to_string()));
        }

        self.view.send_modify(|v| {
            v.info_button = ButtonState::disabled("Loading...");
            v.info_panel = None;
        });
        self.status.hide();

        let result = self.api.video_info(url).await;

        self.view.send_modify(|v| {
            v.info_button = ButtonState::ready(INFO_LABEL);
            if let Ok(info) = &result {
                v.info_panel = Some(info.clone());
            }
        });

        match result {
            Ok(info) => {
                info!("Fetched info for {}: {:?}", url, info.title);
                Ok(info)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Submits a download job for `url`, polling progress while the server works,
    /// then saves the produced file into the download directory.
    pub async fn start_download(&self, url: &str, filename: Option<&str>) -> Result<PathBuf> {
        let Some(guard) = InFlight::acquire(&self.downloading) else {
            return self.fail(ClientError::ConcurrentOperation("download"));
        };

        let url = url.trim();
        if url.is_empty() {
            return self.fail(ClientError::Validation("Please enter a video URL".to_string()));
        }

        let request = {
            let view = self.view.borrow();
            DownloadRequest {
                url: url.to_string(),
                media_type: view.media_type,
                quality: view.active_quality().to_string(),
                filename: filename
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            }
        };

        self.status.hide();
        self.view.send_modify(|v| {
            v.submit_button = ButtonState::disabled("Downloading...");
            v.progress_visible = true;
            v.progress = DownloadJobState::baseline();
            v.saved_file = None;
        });

        let view = self.view.clone();
        let polling = self
            .poller
            .start(move |state| view.send_modify(|v| v.progress = state))
            .await;
        let teardown = Teardown {
            view: &self.view,
            _polling: polling,
        };

        info!(
            "Starting {:?} download of {} (quality {})",
            request.media_type, request.url, request.quality
        );
        let outcome = self.run_download(&request).await;

        // Polling is torn down before anything final is shown.
        self.poller.stop().await;
        self.view.send_modify(|v| {
            v.submit_button = ButtonState::ready(DOWNLOAD_LABEL);
            if let Ok((_, path)) = &outcome {
                v.saved_file = Some(path.clone());
            }
        });
        drop(teardown);
        drop(guard);

        match outcome {
            Ok((name, path)) => {
                self.status.show(
                    format!("Download complete! File: {}", name),
                    BannerKind::Success,
                );
                Ok(path)
            }
            Err(e) => self.fail(e),
        }
    }

    async fn run_download(&self, request: &DownloadRequest) -> Result<(String, PathBuf)> {
        let name = self.api.download(request).await?;
        let path = self
            .api
            .save_file(&api::download_file_path(&name), &self.download_dir, &name)
            .await?;
        Ok((name, path))
    }

    fn fail<T>(&self, err: ClientError) -> Result<T> {
        error!("{}", err);
        self.status.show(err.to_string(), BannerKind::Error);
        Err(err)
    }
}
