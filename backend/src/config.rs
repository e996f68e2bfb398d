use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Folder under `media_root` where uploads are written.
pub const UPLOAD_DIR: &str = "csv_uploads";

/// Runtime settings. Read from an optional `quote-aggregator.toml` next to the
/// binary, then from `APP_*` environment variables (`APP_PORT=9000`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Root directory that relative upload paths are resolved against.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Number of jobs allowed to run at the same time.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Maximum rows per insert statement when writing results.
    #[serde(default = "default_result_batch_size")]
    pub result_batch_size: usize,
    /// Events buffered per live subscriber before new ones are dropped.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
    #[serde(default = "default_upload_limit_bytes")]
    pub upload_limit_bytes: usize,
    #[serde(default = "default_results_page_size")]
    pub results_page_size: u32,
    /// Seconds a finished task's status stays queryable.
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("quotes.sqlite")
}

fn default_workers() -> usize {
    4
}

fn default_result_batch_size() -> usize {
    500
}

fn default_subscriber_buffer() -> usize {
    32
}

fn default_upload_limit_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_results_page_size() -> u32 {
    50
}

fn default_result_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            media_root: default_media_root(),
            database_path: default_database_path(),
            workers: default_workers(),
            result_batch_size: default_result_batch_size(),
            subscriber_buffer: default_subscriber_buffer(),
            upload_limit_bytes: default_upload_limit_bytes(),
            results_page_size: default_results_page_size(),
            result_ttl_secs: default_result_ttl_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("quote-aggregator").required(false))
            .add_source(Environment::with_prefix("APP").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.media_root.join(UPLOAD_DIR)
    }
}
