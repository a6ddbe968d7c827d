use serde::{Deserialize, Serialize};

/// Snapshot of the server-side download job, as returned by `GET /api/progress`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadJobState {
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub speed: String,
    #[serde(default)]
    pub downloaded: String,
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub eta: String,
    /// Set only on the local placeholder shown before the first tick.
    #[serde(skip)]
    pub is_baseline: bool,
}

impl DownloadJobState {
    /// What is shown between submitting a download and the first progress tick.
    pub fn baseline() -> Self {
        Self {
            percentage: 0.0,
            status: "Preparing...".to_string(),
            speed: "N/A".to_string(),
            downloaded: "0 MB".to_string(),
            total: "0 MB".to_string(),
            eta: "N/A".to_string(),
            is_baseline: true,
        }
    }

    /// Bar fill in percent, clamped to `[0, 100]`.
    pub fn fill(&self) -> f64 {
        self.percentage.clamp(0.0, 100.0)
    }

    pub fn percentage_text(&self) -> String {
        if self.is_baseline {
            return "0%".to_string();
        }
        format!("{:.1}%", self.fill())
    }

    pub fn status_text(&self) -> String {
        let mut chars = self.status.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn size_text(&self) -> String {
        format!("{} / {}", self.downloaded, self.total)
    }
}

impl Default for DownloadJobState {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Cosmetic progress for the conversion upload. Advanced at fixed checkpoints,
/// never from transfer telemetry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StagedProgress {
    #[default]
    Hidden,
    Uploading,
    ResponseReceived,
    Complete,
}

impl StagedProgress {
    pub fn percent(self) -> u8 {
        match self {
            StagedProgress::Hidden => 0,
            StagedProgress::Uploading => 30,
            StagedProgress::ResponseReceived => 70,
            StagedProgress::Complete => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StagedProgress::Hidden => "",
            StagedProgress::Uploading | StagedProgress::ResponseReceived => {
                "Uploading and converting your video..."
            }
            StagedProgress::Complete => "Conversion complete!",
        }
    }

    pub fn is_visible(self) -> bool {
        self != StagedProgress::Hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounds_to_one_decimal() {
        let state: DownloadJobState = serde_json::from_value(serde_json::json!({
            "percentage": 42.37,
            "status": "downloading",
            "speed": "1.20 MB/s",
            "downloaded": "10.5 MB",
            "total": "24.8 MB",
            "eta": "12s"
        }))
        .unwrap();

        assert_eq!(state.percentage_text(), "42.4%");
        assert_eq!(state.fill(), 42.37);
        assert_eq!(state.status_text(), "Downloading");
        assert_eq!(state.size_text(), "10.5 MB / 24.8 MB");
    }

    #[test]
    fn test_baseline() {
        let state = DownloadJobState::baseline();
        assert_eq!(state.percentage_text(), "0%");
        assert_eq!(state.status_text(), "Preparing...");
        assert_eq!(state.size_text(), "0 MB / 0 MB");
        assert_eq!(state.eta, "N/A");
    }

    #[test]
    fn test_polled_zero_keeps_one_decimal() {
        let state: DownloadJobState =
            serde_json::from_value(serde_json::json!({"percentage": 0, "status": "starting"}))
                .unwrap();
        assert!(!state.is_baseline);
        assert_eq!(state.percentage_text(), "0.0%");
    }

    #[test]
    fn test_fill_is_clamped() {
        let state = DownloadJobState {
            percentage: 104.0,
            ..DownloadJobState::baseline()
        };
        assert_eq!(state.fill(), 100.0);
    }

    #[test]
    fn test_staged_checkpoints() {
        assert_eq!(StagedProgress::Uploading.percent(), 30);
        assert_eq!(StagedProgress::ResponseReceived.percent(), 70);
        assert_eq!(StagedProgress::Complete.percent(), 100);
        assert!(!StagedProgress::Hidden.is_visible());
    }
}
