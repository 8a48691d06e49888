//! The page source behind the cache: fetch over HTTP, then extract.

use async_trait::async_trait;
use chrono::Utc;
use idfdocs_core::{DocLocation, DocRoot, Error, PageSource, ParsedPage};
use std::sync::Arc;
use url::Url;

use crate::extract::extract;
use crate::fetch::Fetcher;

/// Loads pages for any version under one documentation base URL.
pub struct FetchingSource {
    fetcher: Arc<dyn Fetcher>,
    base_url: Url,
}

impl FetchingSource {
    pub fn new(fetcher: Arc<dyn Fetcher>, base_url: Url) -> Self {
        Self { fetcher, base_url }
    }
}

#[async_trait]
impl PageSource for FetchingSource {
    async fn load(&self, location: &DocLocation) -> Result<ParsedPage, Error> {
        let root = DocRoot::new(&self.base_url, location.version().clone())?;
        let fetched = self.fetcher.fetch(location.url()).await?;

        let extraction = extract(&fetched, &root);
        tracing::debug!(
            "extracted {} ({} bytes, {} links, api section: {})",
            location,
            fetched.body.len(),
            extraction.links.len(),
            !extraction.api_text.is_empty()
        );

        Ok(extraction.into_page(location.clone(), fetched.body.len(), Utc::now()))
    }
}
