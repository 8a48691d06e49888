//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `base_url`, `version` or `chip_target` cannot form a documentation root
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `request_timeout_ms` is shorter than `timeout_ms`
    /// - `max_retries` exceeds 10
    /// - `cache_capacity` is 0 or exceeds 10000
    /// - `max_results` is 0 or exceeds 1000
    /// - `max_query_length` is 0 or exceeds 1000
    /// - `crawl_max_pages` or `crawl_concurrency` is 0
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.doc_root()?;

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }
        if self.request_timeout_ms < self.timeout_ms {
            return Err(invalid("request_timeout_ms", "must be at least timeout_ms"));
        }

        if self.max_retries > 10 {
            return Err(invalid("max_retries", "must not exceed 10"));
        }

        if self.cache_capacity == 0 || self.cache_capacity > 10_000 {
            return Err(invalid("cache_capacity", "must be between 1 and 10000"));
        }

        if self.max_results == 0 || self.max_results > 1000 {
            return Err(invalid("max_results", "must be between 1 and 1000"));
        }

        if self.max_query_length == 0 || self.max_query_length > 1000 {
            return Err(invalid("max_query_length", "must be between 1 and 1000"));
        }

        if self.crawl_max_pages == 0 {
            return Err(invalid("crawl_max_pages", "must be greater than 0"));
        }
        if self.crawl_concurrency == 0 {
            return Err(invalid("crawl_concurrency", "must be greater than 0"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.cache_capacity < self.crawl_max_pages {
            tracing::warn!(
                cache_capacity = self.cache_capacity,
                crawl_max_pages = self.crawl_max_pages,
                "cache_capacity is smaller than crawl_max_pages; \
                 crawled pages will be evicted before they can be searched"
            );
        }

        Ok(())
    }
}
