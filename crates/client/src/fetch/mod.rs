//! HTTP fetch pipeline for documentation pages.
//!
//! ### Requests
//! - GET with an HTML-preferring `Accept` header and the configured User-Agent
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable), checked against `Content-Length`
//!   and again after the body is read
//!
//! ### Failure Handling
//! - Each attempt is bounded by the per-attempt timeout
//! - Timeouts, connection failures and 5xx responses are retried with
//!   exponential backoff and jitter, bounded by `max_retries`
//! - 4xx responses and oversized bodies fail immediately
//! - The whole call, retries included, never runs past the fetch deadline

pub mod retry;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Client, header};
use std::time::Duration;
use tokio::time::Instant;

pub use retry::RetryPolicy;
pub use url::{UrlError, canonicalize};

use idfdocs_core::{AppConfig, Error};
use reqwest::Url;

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "esp-idf-docs-mcp/0.1 (Documentation Search Bot)")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Per-attempt timeout (default: 20s)
    pub timeout: Duration,

    /// Budget for one fetch call including retries (default: 60s)
    pub deadline: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Backoff for transient failures
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "esp-idf-docs-mcp/0.1 (Documentation Search Bot)".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            deadline: Duration::from_millis(60000),
            max_redirects: 5,
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            deadline: config.request_timeout(),
            retry: RetryPolicy { max_retries: config.max_retries, ..RetryPolicy::default() },
            ..Self::default()
        }
    }
}

/// A successfully fetched page body and its metadata.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub body: Bytes,
    /// When the response finished
    pub fetched_at: DateTime<Utc>,
    /// Time taken to fetch in milliseconds, retries included
    pub fetch_ms: u64,
}

impl FetchedPage {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Whether the body should go through the HTML extractor.
    ///
    /// A missing Content-Type is treated as HTML; the documentation host
    /// serves every page as `text/html`.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(content_type) => {
                let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
                mime == "text/html" || mime == "application/xhtml+xml"
            }
            None => true,
        }
    }
}

/// Retrieves raw page bodies.
///
/// The seam between the page cache and the network; tests substitute canned fetchers.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, Error>;
}

/// reqwest-backed [`Fetcher`] with retries and size limits.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Fetch `url`, giving up once `deadline` passes.
    pub async fn fetch_until(&self, url: &Url, deadline: Instant) -> Result<FetchedPage, Error> {
        let start = Instant::now();
        let mut page =
            retry::run(&self.config.retry, deadline, self.config.timeout, url.as_str(), || self.attempt(url)).await?;
        page.fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            page.url,
            page.final_url,
            page.fetch_ms,
            page.body.len()
        );

        Ok(page)
    }

    async fn attempt(&self, url: &Url) -> Result<FetchedPage, Error> {
        let response = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http { status: status.as_u16(), url: url.to_string() });
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.bytes().await.map_err(|e| classify(url, e))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        Ok(FetchedPage {
            url: url.clone(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
            fetched_at: Utc::now(),
            fetch_ms: 0,
        })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, Error> {
        self.fetch_until(url, Instant::now() + self.config.deadline).await
    }
}

fn classify(url: &Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url} timed out: {err}"))
    } else {
        Error::Network(format!("network error fetching {url}: {err}"))
    }
}
