use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server_url: String,
    pub log_level: String,
    pub download_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub success_dismiss_ms: u64,
    pub settle_delay_ms: u64,
    pub upload_extension: String,
    pub max_upload_bytes: u64,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            // Default settings
            .set_default("server_url", "http://127.0.0.1:5000")?
            .set_default("log_level", "info")?
            .set_default("download_dir", "./downloads")?
            .set_default("poll_interval_ms", 1000)?
            .set_default("success_dismiss_ms", 5000)?
            .set_default("settle_delay_ms", 1000)?
            .set_default("upload_extension", "mod")?
            .set_default("max_upload_bytes", 500 * 1024 * 1024)?
            // Config file (optional)
            .add_source(File::with_name("config").required(false))
            // Environment variables (e.g. MEDIADESK_SERVER_URL=http://nas:5000)
            .add_source(Environment::with_prefix("MEDIADESK"));

        builder.build()?.try_deserialize()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn success_dismiss(&self) -> Duration {
        Duration::from_millis(self.success_dismiss_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
pub(crate) fn test_settings(server_url: &str, download_dir: PathBuf) -> Settings {
    Settings {
        server_url: server_url.to_string(),
        log_level: "debug".to_string(),
        download_dir,
        poll_interval_ms: 20,
        success_dismiss_ms: 5000,
        settle_delay_ms: 10,
        upload_extension: "mod".to_string(),
        max_upload_bytes: 1024,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new().unwrap();
        assert_eq!(settings.upload_extension, "mod");
        assert_eq!(settings.max_upload_bytes, 524_288_000);
        assert_eq!(settings.poll_interval(), Duration::from_secs(1));
        assert_eq!(settings.success_dismiss(), Duration::from_secs(5));
    }
}
