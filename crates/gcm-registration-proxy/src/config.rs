//! Configuration for the registration daemon.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Messaging backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Token storage configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Bundled asset configuration
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Application identity
    #[serde(default)]
    pub app: AppConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Messaging backend REST API URL
    #[serde(default = "default_backend_api_url")]
    pub api_url: String,

    /// Request timeout
    #[serde(default = "default_backend_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the registration document
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,

    /// Enable persistence (if false, the token is kept in memory only)
    #[serde(default = "default_true")]
    pub persist: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    /// Directory with bundled assets
    #[serde(default = "default_assets_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Application id announced to the backend
    #[serde(default = "default_app_id")]
    pub id: String,

    /// Installed application version code
    #[serde(default = "default_version_code")]
    pub version_code: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default implementations
impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: default_backend_api_url(),
            timeout: default_backend_timeout(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            persist: true,
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: default_assets_dir(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            id: default_app_id(),
            version_code: default_version_code(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_backend_api_url() -> String {
    "http://gcm-backend:8080".into()
}

fn default_backend_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("/data")
}

fn default_true() -> bool {
    true
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_app_id() -> String {
    "gcm-registration-proxy".into()
}

fn default_version_code() -> i32 {
    1
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
