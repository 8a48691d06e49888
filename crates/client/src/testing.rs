//! Canned fetchers and fixtures shared by the unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use idfdocs_core::{CacheConfig, DocRoot, DocVersion, Error, PageCache};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::fetch::{FetchedPage, Fetcher};
use crate::source::FetchingSource;

pub const BASE: &str = "https://docs.example.com/idf";

pub fn base_url() -> Url {
    Url::parse(BASE).unwrap()
}

pub fn root() -> DocRoot {
    DocRoot::new(&base_url(), DocVersion::latest()).unwrap()
}

/// Absolute URL of `path` under the "latest" root.
pub fn url_of(path: &str) -> String {
    format!("{BASE}/en/latest/{path}")
}

/// An HTML page with a title, a body paragraph and links.
pub fn html_page(title: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links.iter().map(|href| format!("<a href=\"{href}\">{href}</a>")).collect();
    format!(
        "<html><head><title>{title}</title></head><body><div class=\"document\"><h1>{title}</h1><p>{body}</p>\
         <nav>{anchors}</nav></div></body></html>"
    )
}

/// Serves canned bodies keyed by absolute URL; unknown URLs are 404.
#[derive(Default)]
pub struct StubFetcher {
    pages: Mutex<HashMap<String, Result<String, u16>>>,
    calls: AtomicUsize,
    per_url: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    /// Serve `html` at `path` under the "latest" root.
    pub fn page(self, path: &str, html: impl Into<String>) -> Self {
        self.set(path, Ok(html.into()));
        self
    }

    pub fn set(&self, path: &str, response: Result<String, u16>) {
        self.pages.lock().unwrap().insert(url_of(path), response);
    }

    /// Total fetches so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Fetches of one path so far.
    pub fn calls_for(&self, path: &str) -> usize {
        self.per_url.lock().unwrap().get(&url_of(path)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.per_url.lock().unwrap().entry(url.to_string()).or_default() += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.pages.lock().unwrap().get(url.as_str()).cloned();
        match response {
            Some(Ok(body)) => Ok(FetchedPage {
                url: url.clone(),
                final_url: url.clone(),
                status: 200,
                content_type: Some("text/html; charset=utf-8".into()),
                body: Bytes::from(body),
                fetched_at: Utc::now(),
                fetch_ms: 0,
            }),
            Some(Err(status)) => Err(Error::Http { status, url: url.to_string() }),
            None => Err(Error::Http { status: 404, url: url.to_string() }),
        }
    }
}

/// A page cache loading from `fetcher` through the real extractor.
pub fn cache(fetcher: Arc<StubFetcher>) -> Arc<PageCache> {
    let source = FetchingSource::new(fetcher, base_url());
    Arc::new(PageCache::new(Arc::new(source), CacheConfig::default()))
}
