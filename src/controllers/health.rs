use crate::api::ApiClient;
use crate::model::HealthReport;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Pre-flight capability check. Starts open and, once closed, stays closed for
/// the life of the gate.
#[derive(Debug)]
pub struct HealthGate {
    open: AtomicBool,
}

impl Default for HealthGate {
    fn default() -> Self {
        Self {
            open: AtomicBool::new(true),
        }
    }
}

impl HealthGate {
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Queries `/health` and closes the gate if the converter reports FFmpeg
    /// missing. Transport failures leave the gate open and yield `None`.
    pub async fn check(&self, api: &ApiClient) -> Option<HealthReport> {
        match api.health().await {
            Ok(report) => {
                info!(
                    "Server health: {} (ffmpeg available: {})",
                    report.status.as_deref().unwrap_or("unknown"),
                    report.ffmpeg_available
                );
                if !report.ffmpeg_available {
                    self.open.store(false, Ordering::SeqCst);
                }
                Some(report)
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                None
            }
        }
    }
}
