//! Configuration module for Tubely Ingest
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation. The resulting [`Config`]
//! is built once at startup and shared read-only by every request.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.bucket must not be empty".into(),
            ));
        }

        if self.storage.bucket.contains(crate::s3::locator::DELIMITER) {
            return Err(ConfigError::ValidationError(format!(
                "storage.bucket '{}' must not contain '{}'",
                self.storage.bucket,
                crate::s3::locator::DELIMITER
            )));
        }

        if self.storage.region.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.region must not be empty".into(),
            ));
        }

        if self.storage.access_key.is_some() != self.storage.secret_key.is_some() {
            return Err(ConfigError::ValidationError(
                "storage.access_key and storage.secret_key must be set together".into(),
            ));
        }

        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must not be empty".into(),
            ));
        }

        if self.upload.max_body_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_body_bytes must be greater than zero".into(),
            ));
        }

        if self.media.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "media.timeout_secs must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
}

/// Object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint (MinIO, RustFS, ...). Enables path-style addressing.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default)]
    pub issuer: Option<String>,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
    /// Directory for request-scoped temporary files. Defaults to the system temp dir.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl UploadConfig {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            temp_dir: None,
        }
    }
}

fn default_max_body_bytes() -> u64 {
    1 << 30 // 1 GiB
}

/// External media tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
    /// Upper bound for a single tool invocation
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

impl MediaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_tool_timeout_secs() -> u64 {
    600
}

/// Video record store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON array of video records loaded into the in-memory store at startup
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            address: default_metrics_address(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_address() -> String {
    "0.0.0.0:9090".to_string()
}
