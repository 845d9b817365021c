//! Configuration management.
//!
//! Settings come from built-in defaults, an optional TOML file and
//! `ARXIV_FETCH__SECTION__KEY` environment variables, in increasing order of
//! precedence.
//!
//! # Configuration File Format
//!
//! ```toml
//! [network]
//! api_url = "http://export.arxiv.org/api/query"
//! request_timeout_secs = 30
//! download_timeout_secs = 60
//! max_retries = 3
//! retry_backoff_base = 2.0
//!
//! [downloads]
//! directory = "~/Downloads/arxiv_papers"
//! max_concurrent = 5
//! request_delay_ms = 1000
//! max_filename_length = 100
//!
//! [cache]
//! enabled = true
//! search_ttl_secs = 3600
//! paper_ttl_secs = 604800
//!
//! [search]
//! default_query = "cat:cs.AI"
//! default_max_results = 10
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::arxiv::DEFAULT_API_URL;
use crate::download::{DownloadOptions, DEFAULT_CONCURRENCY};
use crate::error::ArxivError;
use crate::utils::filename::DEFAULT_MAX_FILENAME_LENGTH;
use crate::utils::{RetryConfig, DEFAULT_USER_AGENT};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "ARXIV_FETCH";

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "arxiv-fetch.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub downloads: DownloadConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP and retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Total attempts per request, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_base")]
    pub retry_backoff_base: f64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
            download_timeout_secs: default_download_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_base: default_backoff_base(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_download_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> f64 {
    2.0
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_dir")]
    pub directory: PathBuf,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Pause between sequential downloads
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    #[serde(default = "default_max_filename_length")]
    pub max_filename_length: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
            max_concurrent: default_max_concurrent(),
            request_delay_ms: default_request_delay(),
            max_filename_length: default_max_filename_length(),
        }
    }
}

fn default_max_concurrent() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_request_delay() -> u64 {
    1000
}

fn default_max_filename_length() -> usize {
    DEFAULT_MAX_FILENAME_LENGTH
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Falls back to the user cache directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_search_ttl")]
    pub search_ttl_secs: u64,

    #[serde(default = "default_paper_ttl")]
    pub paper_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            search_ttl_secs: default_search_ttl(),
            paper_ttl_secs: default_paper_ttl(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_search_ttl() -> u64 {
    3600 // 1 hour
}

fn default_paper_ttl() -> u64 {
    604_800 // 1 week
}

/// Defaults for the search command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_query")]
    pub default_query: String,

    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_query: default_query(),
            default_max_results: default_max_results(),
        }
    }
}

fn default_query() -> String {
    "cat:cs.AI".to_string()
}

fn default_max_results() -> usize {
    10
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default download directory: `<user download dir>/arxiv_papers`
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .map(|d| d.join("arxiv_papers"))
        .unwrap_or_else(|| PathBuf::from("./arxiv_papers"))
}

/// Default cache directory: `<user cache dir>/arxiv-fetch`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("arxiv-fetch"))
        .unwrap_or_else(|| PathBuf::from(".arxiv-fetch-cache"))
}

/// User-level config file location
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("arxiv-fetch").join("config.toml"))
}

/// Find a config file in the working directory or the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    user_config_path().filter(|p| p.is_file())
}

/// Load configuration, layering an optional file and the environment over
/// the defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, ArxivError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        if !path.is_file() {
            return Err(ArxivError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ArxivError::Config(e.to_string()))?;

    settings
        .try_deserialize()
        .map_err(|e| ArxivError::Config(e.to_string()))
}

impl Config {
    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, ArxivError> {
        toml::to_string_pretty(self).map_err(|e| ArxivError::Config(e.to_string()))
    }

    /// Write the configuration to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ArxivError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.network.max_retries, self.network.retry_backoff_base)
    }

    /// Download options for `directory`, or the configured one
    pub fn download_options(&self, directory: Option<&Path>) -> DownloadOptions {
        let dir = directory
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.downloads.directory.clone());
        DownloadOptions::new(dir)
            .timeout(Duration::from_secs(self.network.download_timeout_secs))
            .request_delay(Duration::from_millis(self.downloads.request_delay_ms))
            .max_filename_length(self.downloads.max_filename_length)
    }
}
