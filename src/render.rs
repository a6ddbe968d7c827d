//! Plain-text rendering of controller views for the terminal.

use crate::controllers::conversion::ConversionView;
use crate::controllers::download::DownloadView;
use crate::model::VideoMetadata;
use crate::progress::DownloadJobState;
use crate::status::Banner;

const BAR_WIDTH: usize = 30;

fn bar(fill: f64) -> String {
    let filled = ((fill / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn job_progress(state: &DownloadJobState) -> String {
    format!(
        "{} {:>6}  {}  {}  {}  ETA {}",
        bar(state.fill()),
        state.percentage_text(),
        state.status_text(),
        state.speed,
        state.size_text(),
        state.eta
    )
}

pub fn video_info(info: &VideoMetadata) -> String {
    let mut out = format!(
        "Title:     {}\nUploader:  {}\nDuration:  {}\nViews:     {}\n",
        info.title.as_deref().unwrap_or("N/A"),
        info.uploader.as_deref().unwrap_or("N/A"),
        info.duration_text(),
        info.views_text()
    );
    if let Some(thumb) = &info.thumbnail_url {
        out.push_str(&format!("Thumbnail: {}\n", thumb));
    }
    out
}

pub fn download_view(view: &DownloadView) -> String {
    let mut out = format!("{:?} quality: {}\n", view.media_type, view.active_quality());
    if let Some(info) = &view.info_panel {
        out.push_str(&video_info(info));
    }
    if view.progress_visible {
        out.push_str(&job_progress(&view.progress));
        out.push('\n');
    }
    if let Some(path) = &view.saved_file {
        out.push_str(&format!("Saved to {}\n", path.display()));
    }
    out
}

pub fn conversion_view(view: &ConversionView) -> String {
    let mut out = String::new();
    if let Some(file) = &view.selected {
        out.push_str(&format!("File: {} ({} bytes)\n", file.name, file.size_bytes));
    }
    out.push_str(&format!("Quality: {}\n", view.quality.description()));
    if view.progress.is_visible() {
        let percent = view.progress.percent();
        out.push_str(&format!(
            "{} {}%  {}\n",
            bar(percent as f64),
            percent,
            view.progress.label()
        ));
    }
    if let Some(result) = &view.result {
        out.push_str(&format!("Ready: {} ({})\n", result.filename, result.download_url));
    }
    out
}

pub fn banner(banner: Option<&Banner>) -> String {
    banner.map(Banner::text).unwrap_or_default()
}
