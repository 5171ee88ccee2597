//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::query::{DEFAULT_PER_PAGE, MAX_PER_PAGE};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Log store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("misslog").to_string_lossy().to_string())
        .unwrap_or_else(|| "./misslog_data".to_string())
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl StorageConfig {
    /// Store settings with a leading `~` in `data_dir` expanded
    pub fn to_store_config(&self) -> crate::store::StoreConfig {
        crate::store::StoreConfig {
            data_dir: expand_home(&self.data_dir),
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_per_page")]
    pub default_per_page: u32,

    #[serde(default = "default_max_per_page")]
    pub max_per_page: u32,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    #[serde(default = "default_enable_export")]
    pub enable_export: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8404
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_max_per_page() -> u32 {
    MAX_PER_PAGE
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024 // 2MB
}

fn default_enable_export() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            max_body_size: default_max_body_size(),
            enable_export: default_enable_export(),
        }
    }
}

impl ApiConfig {
    pub fn to_api_config(&self) -> crate::api::ApiConfig {
        crate::api::ApiConfig {
            host: self.host.clone(),
            port: self.port,
            default_per_page: self.default_per_page,
            max_per_page: self.max_per_page,
            max_body_size: self.max_body_size,
            enable_export: self.enable_export,
        }
    }
}

/// Retention sweeper configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Expire events older than this many days; 0 keeps everything
    #[serde(default)]
    pub days: u32,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    3600
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days: 0,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        for path in Self::default_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Config file locations, most specific first
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("misslog").join("config.toml")),
            Some(PathBuf::from("/etc/misslog/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Storage overrides
        if let Ok(data_dir) = std::env::var("MISSLOG_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }

        // API overrides
        if let Ok(host) = std::env::var("MISSLOG_API_HOST") {
            self.api.host = host;
        }
        if let Ok(port) = std::env::var("MISSLOG_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid MISSLOG_API_PORT"),
            }
        }

        // Retention overrides
        if let Ok(days) = std::env::var("MISSLOG_RETENTION_DAYS") {
            match days.parse() {
                Ok(d) => self.retention.days = d,
                Err(_) => tracing::warn!(value = %days, "Ignoring invalid MISSLOG_RETENTION_DAYS"),
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("MISSLOG_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("MISSLOG_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# misslog Configuration
#
# Environment variables override these settings:
# - MISSLOG_DATA_DIR
# - MISSLOG_API_HOST
# - MISSLOG_API_PORT
# - MISSLOG_RETENTION_DAYS
# - MISSLOG_LOG_LEVEL
# - MISSLOG_LOG_FORMAT

[storage]
# Directory holding misslog.db
data_dir = "~/.local/share/misslog"

# How long a writer waits on a locked database (ms)
busy_timeout_ms = 5000

[api]
# API server host
host = "127.0.0.1"

# API server port
port = 8404

# Page size when a list request names none
default_per_page = 25

# Largest page size a caller may request
max_per_page = 200

# Maximum request body size (bytes)
max_body_size = 2097152

# Enable the export endpoint
enable_export = true

[retention]
# Expire misses older than this many days (0 keeps everything)
days = 0

# How often the sweeper runs (seconds)
sweep_interval_secs = 3600

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
