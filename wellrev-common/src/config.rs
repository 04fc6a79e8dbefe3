//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the service logs a warning and
//! starts with compiled defaults. A TOML file that exists but cannot be
//! parsed is reported as [`Error::Config`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default clustering service base URL
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:5000";

/// Default port for the review HTTP API
pub const DEFAULT_PORT: u16 = 5740;

/// Number of clusters the service starts with
pub const DEFAULT_BASELINE_CLUSTERS: u32 = 3;

/// Per-request timeout for calls to the clustering service
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// File name offered for the results download
pub const DEFAULT_EXPORT_FILENAME: &str = "Results.csv";

/// Environment variable overriding the clustering service URL
pub const SERVICE_URL_ENV: &str = "WELLREV_SERVICE_URL";

/// Environment variable overriding the TOML config path
pub const CONFIG_PATH_ENV: &str = "WELLREV_CONFIG";

/// Configuration loaded from the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Clustering service base URL (optional, see [`resolve_service_url`])
    #[serde(default)]
    pub service_url: Option<String>,

    /// HTTP API port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Cluster count the session starts from
    #[serde(default = "default_baseline_clusters")]
    pub baseline_clusters: u32,

    /// Timeout for each request to the clustering service
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// File name used for the results download
    #[serde(default = "default_export_filename")]
    pub export_filename: String,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            port: default_port(),
            baseline_clusters: default_baseline_clusters(),
            request_timeout_secs: default_request_timeout_secs(),
            export_filename: default_export_filename(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_baseline_clusters() -> u32 {
    DEFAULT_BASELINE_CLUSTERS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_export_filename() -> String {
    DEFAULT_EXPORT_FILENAME.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Check values that serde cannot express as types
    pub fn validate(&self) -> Result<()> {
        if self.baseline_clusters == 0 {
            return Err(Error::Config(
                "baseline_clusters must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.export_filename.trim().is_empty() {
            return Err(Error::Config("export_filename must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Default configuration file path for the platform
///
/// `<config_dir>/wellrev/wellrev.toml`, e.g. `~/.config/wellrev/wellrev.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wellrev").join("wellrev.toml"))
}

/// Resolve which config file to read: CLI → ENV → platform default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Load the TOML config file, falling back to defaults when it is missing
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve the clustering service base URL
///
/// **Priority:** CLI → ENV (`WELLREV_SERVICE_URL`) → TOML → compiled default.
/// Trailing slashes are stripped so endpoint paths can be appended directly.
pub fn resolve_service_url(cli_arg: Option<&str>, config: &TomlConfig) -> String {
    let chosen = if let Some(url) = cli_arg.filter(|u| is_valid_url(u)) {
        url.to_string()
    } else if let Some(url) = std::env::var(SERVICE_URL_ENV)
        .ok()
        .filter(|u| is_valid_url(u))
    {
        url
    } else if let Some(url) = config.service_url.as_deref().filter(|u| is_valid_url(u)) {
        url.to_string()
    } else {
        DEFAULT_SERVICE_URL.to_string()
    };

    chosen.trim().trim_end_matches('/').to_string()
}

/// A usable URL is non-empty and names an http(s) scheme
fn is_valid_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("http://") || url.starts_with("https://")
}
