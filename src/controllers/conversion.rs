use crate::api::{self, ApiClient};
use crate::config::Settings;
use crate::controllers::health::HealthGate;
use crate::controllers::{ButtonState, InFlight};
use crate::error::{ClientError, Result};
use crate::model::{ConversionResult, FileHandle, HealthReport, QualityPreset, UploadCandidate};
use crate::progress::StagedProgress;
use crate::status::{BannerKind, StatusPresenter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

const CONVERT_LABEL: &str = "Convert to MP4";
const CONVERT_AGAIN_LABEL: &str = "Convert Another File";
const UNAVAILABLE_LABEL: &str = "FFmpeg Not Available";

#[derive(Clone, Debug, PartialEq)]
pub struct ConversionView {
    pub drop_highlight: bool,
    pub selected: Option<FileHandle>,
    pub quality: QualityPreset,
    pub convert_button: ButtonState,
    pub progress: StagedProgress,
    pub result: Option<ConversionResult>,
    pub converted_once: bool,
}

impl Default for ConversionView {
    fn default() -> Self {
        Self {
            drop_highlight: false,
            selected: None,
            quality: QualityPreset::default(),
            convert_button: ButtonState::disabled(CONVERT_LABEL),
            progress: StagedProgress::Hidden,
            result: None,
            converted_once: false,
        }
    }
}

pub struct ConversionController {
    api: ApiClient,
    view: watch::Sender<ConversionView>,
    status: StatusPresenter,
    gate: HealthGate,
    converting: AtomicBool,
    allowed_extension: String,
    max_bytes: u64,
    settle_delay: Duration,
}

impl ConversionController {
    pub fn new(settings: &Settings) -> Self {
        let (view, _) = watch::channel(ConversionView::default());
        Self {
            api: ApiClient::new(&settings.server_url),
            view,
            status: StatusPresenter::new(settings.success_dismiss()),
            gate: HealthGate::default(),
            converting: AtomicBool::new(false),
            allowed_extension: settings.upload_extension.to_lowercase(),
            max_bytes: settings.max_upload_bytes,
            settle_delay: settings.settle_delay(),
        }
    }

    pub fn view(&self) -> ConversionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversionView> {
        self.view.subscribe()
    }

    pub fn status(&self) -> &StatusPresenter {
        &self.status
    }

    pub fn is_available(&self) -> bool {
        self.gate.is_open()
    }

    /// Runs the health gate. Meant to be called once, right after construction.
    pub async fn check_health(&self) -> Option<HealthReport> {
        let report = self.gate.check(&self.api).await;
        if !self.gate.is_open() {
            self.status.show(
                ClientError::UnavailableCapability.to_string(),
                BannerKind::Error,
            );
            self.refresh_button();
        }
        report
    }

    pub fn drag_enter(&self) {
        self.view.send_modify(|v| v.drop_highlight = true);
    }

    pub fn drag_leave(&self) {
        self.view.send_modify(|v| v.drop_highlight = false);
    }

    /// Handles a drop: only the first file is considered.
    pub async fn drop_files(&self, paths: &[PathBuf]) -> Result<()> {
        self.drag_leave();
        match paths.first() {
            Some(path) => self.select_path(path).await,
            None => Ok(()),
        }
    }

    /// Picker entry point.
    pub async fn select_path(&self, path: &Path) -> Result<()> {
        match FileHandle::from_path(path).await {
            Ok(file) => self.select_file(file),
            Err(e) => self.fail(e.into()),
        }
    }

    pub fn select_file(&self, file: FileHandle) -> Result<()> {
        if file.extension() != self.allowed_extension {
            return self.fail(ClientError::Validation(format!(
                "Invalid file type. Please select a .{} file.",
                self.allowed_extension
            )));
        }
        if file.size_bytes > self.max_bytes {
            return self.fail(ClientError::Validation(format!(
                "File size exceeds {}MB limit. Please select a smaller file.",
                self.max_bytes / (1024 * 1024)
            )));
        }

        info!("Selected {} ({} bytes)", file.name, file.size_bytes);
        // The unavailable-capability banner outlives file changes.
        if self.gate.is_open() {
            self.status.hide();
        }
        self.view.send_modify(|v| {
            v.selected = Some(file);
            v.result = None;
            v.progress = StagedProgress::Hidden;
        });
        self.refresh_button();
        Ok(())
    }

    pub fn set_quality(&self, quality: QualityPreset) {
        self.view.send_modify(|v| v.quality = quality);
    }

    pub fn candidate(&self) -> Option<UploadCandidate> {
        let view = self.view.borrow();
        view.selected.clone().map(|file| UploadCandidate {
            file,
            quality: view.quality,
        })
    }

    pub async fn convert(&self) -> Result<ConversionResult> {
        let Some(candidate) = self.candidate() else {
            return self.fail(ClientError::NoFileSelected);
        };
        if !self.gate.is_open() {
            return self.fail(ClientError::UnavailableCapability);
        }
        let Some(guard) = InFlight::acquire(&self.converting) else {
            return self.fail(ClientError::ConcurrentOperation("conversion"));
        };

        self.status.hide();
        self.view.send_modify(|v| {
            v.convert_button = ButtonState::disabled("Converting...");
            v.result = None;
            v.progress = StagedProgress::Uploading;
        });

        let outcome = match self.api.send_upload(&candidate).await {
            Ok(resp) => {
                self.view
                    .send_modify(|v| v.progress = StagedProgress::ResponseReceived);
                api::upload_result(resp).await
            }
            Err(e) => Err(e),
        };

        let outcome = match outcome {
            Ok(result) => {
                self.view.send_modify(|v| v.progress = StagedProgress::Complete);
                tokio::time::sleep(self.settle_delay).await;
                self.view.send_modify(|v| {
                    v.progress = StagedProgress::Hidden;
                    v.result = Some(result.clone());
                    v.converted_once = true;
                });
                info!("Converted {} into {}", candidate.file.name, result.filename);
                self.status.show(
                    result
                        .message
                        .clone()
                        .unwrap_or_else(|| "Video converted successfully!".to_string()),
                    BannerKind::Success,
                );
                Ok(result)
            }
            Err(e) => {
                self.view.send_modify(|v| v.progress = StagedProgress::Hidden);
                Err(e)
            }
        };

        drop(guard);
        self.refresh_button();
        outcome.or_else(|e| self.fail(e))
    }

    /// Downloads the last conversion's output into `dir`.
    pub async fn save_result(&self, dir: &Path) -> Result<PathBuf> {
        let Some(result) = self.view.borrow().result.clone() else {
            return self.fail(ClientError::Server(
                "No converted file available".to_string(),
            ));
        };
        match self.api.save_file(&result.download_url, dir, &result.filename).await {
            Ok(path) => Ok(path),
            Err(e) => self.fail(e),
        }
    }

    /// Asks the converter to purge stale uploads and outputs.
    pub async fn request_cleanup(&self) -> Result<String> {
        match self.api.cleanup().await {
            Ok(message) => {
                self.status.show(message.clone(), BannerKind::Info);
                Ok(message)
            }
            Err(e) => self.fail(e),
        }
    }

    fn refresh_button(&self) {
        let open = self.gate.is_open();
        let busy = self.converting.load(Ordering::SeqCst);
        self.view.send_modify(|v| {
            v.convert_button = if !open {
                ButtonState::disabled(UNAVAILABLE_LABEL)
            } else if busy {
                ButtonState::disabled("Converting...")
            } else {
                let label = if v.converted_once {
                    CONVERT_AGAIN_LABEL
                } else {
                    CONVERT_LABEL
                };
                ButtonState {
                    enabled: v.selected.is_some(),
                    label: label.to_string(),
                }
            };
        });
    }

    fn fail<T>(&self, err: ClientError) -> Result<T> {
        error!("{}", err);
        self.status.show(err.to_string(), BannerKind::Error);
        Err(err)
    }
}
