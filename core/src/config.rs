//! Configuration management for Courier

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{CourierError, CourierResult};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Application settings
    #[serde(default)]
    pub app: AppConfig,
    /// Durable storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Scheme, host and port of the API server
    pub base_url: String,
    /// Path prefix shared by every endpoint
    pub base_path: String,
    /// Request timeout (seconds), 0 leaves the transport default
    pub request_timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Debug mode
    pub debug: bool,
    /// Log level
    pub log_level: String,
    /// Configuration directory; the platform default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_dir: Option<PathBuf>,
    /// Data directory; the platform default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Session file name, relative to the data directory
    pub session_file: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: crate::DEFAULT_API_URL.to_string(),
            base_path: crate::API_BASE_PATH.to_string(),
            request_timeout_secs: 30,
            user_agent: format!("{}/{}", crate::APP_NAME.to_lowercase(), crate::VERSION),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            config_dir: None,
            data_dir: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_file: crate::SESSION_FILENAME.to_string(),
        }
    }
}

fn env_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl Config {
    /// Load configuration from file
    pub fn load(config_path: &Path) -> CourierResult<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, config_path: &Path) -> CourierResult<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Self {
        Config::default().apply_env()
    }

    /// Layer environment overrides on top of this configuration
    pub fn apply_env(mut self) -> Self {
        if let Ok(base_url) = std::env::var("COURIER_API_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("COURIER_API_TIMEOUT_SECONDS") {
            if let Ok(secs) = timeout.parse() {
                self.api.request_timeout_secs = secs;
            }
        }

        if let Ok(log_level) = std::env::var("COURIER_LOG_LEVEL") {
            self.app.log_level = log_level;
        }

        if let Ok(debug) = std::env::var("COURIER_DEBUG") {
            self.app.debug = env_flag(&debug);
        }

        if let Ok(config_dir) = std::env::var("COURIER_CONFIG_DIR") {
            self.app.config_dir = Some(PathBuf::from(config_dir));
        }

        if let Ok(data_dir) = std::env::var("COURIER_DATA_DIR") {
            self.app.data_dir = Some(PathBuf::from(data_dir));
        }

        self
    }

    /// Configured directory, or the platform configuration directory
    pub fn config_dir(&self) -> CourierResult<PathBuf> {
        match &self.app.config_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::get_config_dir(),
        }
    }

    /// Configured directory, or the platform data directory
    pub fn data_dir(&self) -> CourierResult<PathBuf> {
        match &self.app.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::get_data_dir(),
        }
    }

    /// Get the configuration file path
    pub fn config_file_path(&self) -> CourierResult<PathBuf> {
        Ok(self.config_dir()?.join(crate::CONFIG_FILENAME))
    }

    /// Get the session file path
    pub fn session_file_path(&self) -> CourierResult<PathBuf> {
        Ok(self.data_dir()?.join(&self.storage.session_file))
    }

    /// Root URL every endpoint path is resolved against
    ///
    /// Always ends with a slash so relative joins keep the base path.
    pub fn api_root(&self) -> CourierResult<Url> {
        let base = self.api.base_url.trim_end_matches('/');
        let path = self.api.base_path.trim_matches('/');
        let root = if path.is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/{}/", base, path)
        };
        Ok(Url::parse(&root)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> CourierResult<()> {
        let url = Url::parse(&self.api.base_url)
            .map_err(|e| CourierError::config(format!("Invalid API base URL '{}': {}", self.api.base_url, e)))?;

        if url.cannot_be_a_base() {
            return Err(CourierError::config("API base URL cannot be used as a base"));
        }

        if !self.api.base_path.starts_with('/') {
            return Err(CourierError::config("API base path must start with '/'"));
        }

        if self.storage.session_file.trim().is_empty() {
            return Err(CourierError::config("Session file name cannot be empty"));
        }

        Ok(())
    }
}
