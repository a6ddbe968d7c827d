use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const VIDEO_QUALITIES: &[(&str, &str)] = &[
    ("144", "144p"),
    ("240", "240p"),
    ("360", "360p"),
    ("480", "480p"),
    ("720", "720p (HD)"),
    ("1080", "1080p (Full HD)"),
    ("best", "Best Available"),
];

pub const AUDIO_QUALITIES: &[(&str, &str)] = &[
    ("64", "64 kbps"),
    ("128", "128 kbps"),
    ("192", "192 kbps"),
    ("256", "256 kbps"),
    ("320", "320 kbps (Best)"),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Video,
    Audio,
}

impl MediaType {
    pub fn qualities(self) -> &'static [(&'static str, &'static str)] {
        match self {
            MediaType::Video => VIDEO_QUALITIES,
            MediaType::Audio => AUDIO_QUALITIES,
        }
    }

    pub fn default_quality(self) -> &'static str {
        match self {
            MediaType::Video => "best",
            MediaType::Audio => "192",
        }
    }

    pub fn accepts_quality(self, quality: &str) -> bool {
        self.qualities().iter().any(|(value, _)| *value == quality)
    }
}

/// Conversion quality preset understood by the converter's `/upload` endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    High,
    #[default]
    Medium,
    Low,
}

impl QualityPreset {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityPreset::High => "high",
            QualityPreset::Medium => "medium",
            QualityPreset::Low => "low",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            QualityPreset::High => "High Quality (1080p, 8 Mbps)",
            QualityPreset::Medium => "Medium Quality (720p, 4 Mbps)",
            QualityPreset::Low => "Low Quality (480p, 2 Mbps)",
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(QualityPreset::High),
            "medium" => Ok(QualityPreset::Medium),
            "low" => Ok(QualityPreset::Low),
            other => Err(format!("unknown quality preset: {}", other)),
        }
    }
}

/// Body of `POST /api/download`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub quality: String,
    pub filename: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct VideoMetadata {
    #[serde(default, rename = "thumbnail")]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default, rename = "duration", deserialize_with = "whole_seconds")]
    pub duration_seconds: Option<u64>,
    #[serde(default)]
    pub view_count: Option<u64>,
}

// Extractors report duration as an integer or a float; either is floored.
fn whole_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = Option::<f64>::deserialize(deserializer)?;
    Ok(seconds.map(|s| if s.is_finite() && s > 0.0 { s.floor() as u64 } else { 0 }))
}

impl VideoMetadata {
    pub fn duration_text(&self) -> String {
        format_duration(self.duration_seconds.unwrap_or(0))
    }

    pub fn views_text(&self) -> String {
        format_count(self.view_count.unwrap_or(0))
    }
}

/// `M:SS`, or `H:MM:SS` past the hour. Zero renders as `N/A`.
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "N/A".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

pub fn format_count(count: u64) -> String {
    if count == 0 {
        return "N/A".to_string();
    }
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// A local file offered for upload, before validation.
#[derive(Clone, Debug, PartialEq)]
pub struct FileHandle {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
}

impl FileHandle {
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            name,
            size_bytes: metadata.len(),
        })
    }

    /// Text after the last dot, lowercased. A name without a dot yields the whole name.
    pub fn extension(&self) -> String {
        self.name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UploadCandidate {
    pub file: FileHandle,
    pub quality: QualityPreset,
}

/// Successful `/upload` response.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ConversionResult {
    pub download_url: String,
    pub filename: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub ffmpeg_available: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
