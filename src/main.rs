mod api;
mod config;
mod controllers;
mod error;
mod model;
mod poller;
mod progress;
mod render;
mod status;
#[cfg(test)]
mod testing;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use crate::config::Settings;
use crate::controllers::conversion::ConversionController;
use crate::controllers::download::DownloadController;
use crate::model::{MediaType, QualityPreset};

#[derive(Debug, Parser)]
#[clap(about = "Drive a media download server or a MOD to MP4 converter from the terminal")]
struct Args {
    /// Overrides `server_url` from the configuration.
    #[clap(long, env = "MEDIADESK_SERVER_URL")]
    server: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Show title, uploader, duration and views for a video URL.
    Info { url: String },
    /// Download a video or its audio track, following server-side progress.
    Download {
        url: String,
        #[clap(long)]
        audio: bool,
        #[clap(long)]
        quality: Option<String>,
        #[clap(long)]
        filename: Option<String>,
    },
    /// Upload a .mod file for conversion to MP4.
    Convert {
        file: PathBuf,
        #[clap(long, default_value = "medium")]
        quality: QualityPreset,
        /// Where to save the converted file. Defaults to the download directory.
        #[clap(long)]
        save_to: Option<PathBuf>,
    },
    /// Report whether the converter can run FFmpeg.
    Health,
    /// Ask the converter to purge stale uploads and outputs.
    Cleanup,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let mut settings = Settings::new().expect("Failed to load configuration");
    let args = Args::parse();
    if let Some(server) = args.server {
        settings.server_url = server;
    }

    tracing_subscriber::fmt()
        .with_env_filter(&settings.log_level)
        .with_writer(std::io::stderr)
        .init();

    info!("Using server {}", settings.server_url);

    let ok = match args.command {
        Command::Info { url } => info_command(&settings, &url).await,
        Command::Download {
            url,
            audio,
            quality,
            filename,
        } => download_command(&settings, &url, audio, quality, filename).await,
        Command::Convert {
            file,
            quality,
            save_to,
        } => convert_command(&settings, &file, quality, save_to).await,
        Command::Health => health_command(&settings).await,
        Command::Cleanup => cleanup_command(&settings).await,
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

async fn info_command(settings: &Settings, url: &str) -> bool {
    let controller = DownloadController::new(settings);
    let result = controller.fetch_metadata(url).await;
    match &result {
        Ok(meta) => print!("{}", render::video_info(meta)),
        Err(_) => println!("{}", render::banner(controller.status().current().as_ref())),
    }
    result.is_ok()
}

async fn download_command(
    settings: &Settings,
    url: &str,
    audio: bool,
    quality: Option<String>,
    filename: Option<String>,
) -> bool {
    let controller = DownloadController::new(settings);
    controller.set_media_type(if audio { MediaType::Audio } else { MediaType::Video });
    if let Some(q) = quality
        && controller.select_quality(&q).is_err()
    {
        println!("{}", render::banner(controller.status().current().as_ref()));
        return false;
    }

    let mut rx = controller.subscribe();
    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let view = rx.borrow_and_update().clone();
            if view.progress_visible && !view.submit_button.enabled {
                eprint!("\r{}", render::job_progress(&view.progress));
            }
        }
    });

    let result = controller.start_download(url, filename.as_deref()).await;
    eprintln!();
    debug!(
        "Download finished: {:?}, polling: {}",
        controller.state(),
        controller.is_polling().await
    );
    print!("{}", render::download_view(&controller.view()));
    println!("{}", render::banner(controller.status().current().as_ref()));

    drop(controller);
    let _ = printer.await;
    result.is_ok()
}

async fn convert_command(
    settings: &Settings,
    file: &Path,
    quality: QualityPreset,
    save_to: Option<PathBuf>,
) -> bool {
    let controller = ConversionController::new(settings);
    controller.check_health().await;

    controller.set_quality(quality);
    if controller.select_path(file).await.is_err() {
        println!("{}", render::banner(controller.status().current().as_ref()));
        return false;
    }
    print!("{}", render::conversion_view(&controller.view()));

    let mut rx = controller.subscribe();
    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let progress = rx.borrow_and_update().progress;
            if progress.is_visible() {
                eprintln!("{}% {}", progress.percent(), progress.label());
            }
        }
    });

    let converted = controller.convert().await.is_ok();
    println!("{}", render::banner(controller.status().current().as_ref()));

    let mut ok = converted;
    if converted {
        let dir = save_to.unwrap_or_else(|| settings.download_dir.clone());
        match controller.save_result(&dir).await {
            Ok(path) => println!("Saved to {}", path.display()),
            Err(_) => {
                println!("{}", render::banner(controller.status().current().as_ref()));
                ok = false;
            }
        }
    }

    drop(controller);
    let _ = printer.await;
    ok
}

async fn health_command(settings: &Settings) -> bool {
    let controller = ConversionController::new(settings);
    match controller.check_health().await {
        Some(report) => {
            println!(
                "{}: {}",
                report.status.as_deref().unwrap_or("unknown"),
                report
                    .message
                    .as_deref()
                    .unwrap_or(if report.ffmpeg_available {
                        "FFmpeg is available"
                    } else {
                        "FFmpeg is not installed"
                    })
            );
            controller.is_available()
        }
        None => {
            println!("Health check failed; see logs");
            false
        }
    }
}

async fn cleanup_command(settings: &Settings) -> bool {
    let controller = ConversionController::new(settings);
    let result = controller.request_cleanup().await;
    println!("{}", render::banner(controller.status().current().as_ref()));
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;
    use crate::testing::{StubBackend, spawn_stub};
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;

    #[test]
    fn test_parse_download_args() {
        let args = Args::parse_from([
            "mediadesk",
            "--server",
            "http://nas:5000",
            "download",
            "https://youtu.be/x",
            "--audio",
            "--quality",
            "320",
        ]);
        assert_eq!(args.server.as_deref(), Some("http://nas:5000"));
        match args.command {
            Command::Download { audio, quality, .. } => {
                assert!(audio);
                assert_eq!(quality.as_deref(), Some("320"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_convert_quality() {
        let args = Args::parse_from(["mediadesk", "convert", "tape.mod", "--quality", "low"]);
        match args.command {
            Command::Convert { quality, .. } => assert_eq!(quality, QualityPreset::Low),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_download_command_end_to_end() {
        let tmp = tempdir().unwrap();
        let stub = StubBackend::default();
        stub.download_delay_ms.store(50, Ordering::SeqCst);
        let base = spawn_stub(stub.clone()).await;
        let settings = test_settings(&base, tmp.path().join("downloads"));

        assert!(download_command(&settings, "https://youtu.be/x", false, Some("720".into()), None).await);
        assert!(tmp.path().join("downloads").join("clip.mp4").exists());
        assert_eq!(stub.download_bodies.lock().unwrap()[0]["quality"], "720");

        assert!(!download_command(&settings, "https://youtu.be/x", false, Some("999".into()), None).await);
    }

    #[tokio::test]
    async fn test_convert_command_end_to_end() {
        let tmp = tempdir().unwrap();
        let stub = StubBackend::default();
        let base = spawn_stub(stub.clone()).await;
        let settings = test_settings(&base, tmp.path().join("downloads"));
        let file = tmp.path().join("tape.mod");
        std::fs::write(&file, b"payload").unwrap();

        assert!(convert_command(&settings, &file, QualityPreset::Low, None).await);
        assert!(tmp.path().join("downloads").join("0f3a_tape.mp4").exists());

        stub.ffmpeg_available.store(false, Ordering::SeqCst);
        assert!(!convert_command(&settings, &file, QualityPreset::Low, None).await);
        assert!(!health_command(&settings).await);
    }
}
