//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ESP_IDF_*)
//! 2. TOML config file (if ESP_IDF_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::CacheConfig;
use crate::docs::{DocRoot, DocVersion};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ESP_IDF_*)
/// 2. TOML config file (if ESP_IDF_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Documentation site base URL.
    ///
    /// Set via ESP_IDF_BASE_URL environment variable.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Active documentation edition ("latest", "v5.1", ...).
    ///
    /// Set via ESP_IDF_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Optional chip target ("esp32", "esp32s3", ...).
    ///
    /// Set via ESP_IDF_CHIP_TARGET environment variable.
    #[serde(default)]
    pub chip_target: Option<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via ESP_IDF_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-attempt HTTP timeout in milliseconds.
    ///
    /// Set via ESP_IDF_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Overall budget for one tool request in milliseconds.
    ///
    /// Set via ESP_IDF_REQUEST_TIMEOUT_MS environment variable.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Retries after the first attempt for transient fetch failures.
    ///
    /// Set via ESP_IDF_MAX_RETRIES environment variable.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum bytes to fetch per page.
    ///
    /// Set via ESP_IDF_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum resident pages in the page cache.
    ///
    /// Set via ESP_IDF_CACHE_CAPACITY environment variable.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Page freshness window in seconds.
    ///
    /// Set via ESP_IDF_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum hits returned by search_docs and find_api_references.
    ///
    /// Set via ESP_IDF_MAX_RESULTS environment variable.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Maximum accepted query length in characters.
    ///
    /// Set via ESP_IDF_MAX_QUERY_LENGTH environment variable.
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Link depth followed from the start page when crawling.
    ///
    /// Set via ESP_IDF_CRAWL_MAX_DEPTH environment variable.
    #[serde(default = "default_crawl_max_depth")]
    pub crawl_max_depth: usize,

    /// Pages fetched per crawl at most.
    ///
    /// Set via ESP_IDF_CRAWL_MAX_PAGES environment variable.
    #[serde(default = "default_crawl_max_pages")]
    pub crawl_max_pages: usize,

    /// Concurrent page fetches per crawl level.
    ///
    /// Set via ESP_IDF_CRAWL_CONCURRENCY environment variable.
    #[serde(default = "default_crawl_concurrency")]
    pub crawl_concurrency: usize,
}

fn default_base_url() -> String {
    "https://docs.espressif.com/projects/esp-idf".into()
}

fn default_version() -> String {
    "latest".into()
}

fn default_user_agent() -> String {
    "esp-idf-docs-mcp/0.1 (Documentation Search Bot)".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_cache_capacity() -> usize {
    256
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_max_results() -> usize {
    20
}

fn default_max_query_length() -> usize {
    100
}

fn default_crawl_max_depth() -> usize {
    3
}

fn default_crawl_max_pages() -> usize {
    50
}

fn default_crawl_concurrency() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            version: default_version(),
            chip_target: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            max_bytes: default_max_bytes(),
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_results: default_max_results(),
            max_query_length: default_max_query_length(),
            crawl_max_depth: default_crawl_max_depth(),
            crawl_max_pages: default_crawl_max_pages(),
            crawl_concurrency: default_crawl_concurrency(),
        }
    }
}

impl AppConfig {
    /// Per-attempt timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Overall request budget as Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The configured documentation edition.
    pub fn doc_version(&self) -> DocVersion {
        DocVersion::new(self.version.clone(), self.chip_target.clone())
    }

    /// Parsed base URL. A value without a scheme is taken as `https://`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `base_url` does not parse or is not http(s).
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid { field: "base_url".into(), reason };
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(invalid("must not be empty".into()));
        }

        let url = if trimmed.contains("://") { Url::parse(trimmed) } else { Url::parse(&format!("https://{trimmed}")) }
            .map_err(|e| invalid(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(invalid(format!("unsupported scheme '{scheme}'"))),
        }
    }

    /// Documentation root for the configured version.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the base URL or version cannot form a root.
    pub fn doc_root(&self) -> Result<DocRoot, ConfigError> {
        DocRoot::new(&self.base_url()?, self.doc_version())
            .map_err(|e| ConfigError::Invalid { field: "version".into(), reason: e.to_string() })
    }

    /// Page cache settings.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig { capacity: self.cache_capacity, ttl: Duration::from_secs(self.cache_ttl_secs) }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ESP_IDF_`
    /// 2. TOML file from `ESP_IDF_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ESP_IDF_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ESP_IDF_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(&figment)
    }

    /// Extract and validate a configuration from an assembled figment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction or validation fails.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
