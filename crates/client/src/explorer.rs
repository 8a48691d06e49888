//! The explorer façade: the four documentation operations.
//!
//! Every operation validates its input before touching the network and runs
//! under the request timeout; a timed-out operation drops its pending loads,
//! which releases their single-flight slots in the page cache.

use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use idfdocs_core::{AppConfig, DocLocation, DocRoot, DocVersion, Error, PageCache, ParsedPage};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

use crate::api::{self, API_REFERENCE_INDEX, ApiReference};
use crate::fetch::{Fetcher, canonicalize};
use crate::index::{CrawlLimits, DirectoryTree, StructureIndex};
use crate::search::{self, Query, SearchHit};
use crate::source::FetchingSource;

/// Section index pages always searched, whether or not they are cached yet.
pub const SEARCH_SECTIONS: &[&str] = &[
    "index.html",
    "api-reference/index.html",
    "api-guides/index.html",
    "get-started/index.html",
    "hw-reference/index.html",
    "security/index.html",
    "api-reference/system/index.html",
    "api-reference/network/index.html",
    "api-reference/bluetooth/index.html",
    "api-reference/peripherals/index.html",
    "api-reference/protocols/index.html",
    "api-reference/storage/index.html",
];

/// Start page of the structure crawl.
const STRUCTURE_START: &str = "index.html";

/// Explorer settings.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Hits returned at most (default: 20)
    pub max_results: usize,

    /// Longest accepted query in characters (default: 100)
    pub max_query_length: usize,

    /// Budget for one operation (default: 60s)
    pub request_timeout: Duration,

    /// Bounds for structure and API crawls
    pub crawl: CrawlLimits,

    /// How long a crawled tree is reused (default: 1h)
    pub structure_ttl: Duration,

    /// Pages fetched for every search (default: [`SEARCH_SECTIONS`])
    pub search_sections: Vec<String>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            max_results: 20,
            max_query_length: 100,
            request_timeout: Duration::from_secs(60),
            crawl: CrawlLimits::default(),
            structure_ttl: Duration::from_secs(3600),
            search_sections: SEARCH_SECTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<&AppConfig> for ExplorerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_results: config.max_results,
            max_query_length: config.max_query_length,
            request_timeout: config.request_timeout(),
            crawl: CrawlLimits {
                max_depth: config.crawl_max_depth,
                max_pages: config.crawl_max_pages,
                concurrency: config.crawl_concurrency,
                subtree_only: false,
            },
            structure_ttl: config.cache_config().ttl,
            ..Self::default()
        }
    }
}

/// Response metadata shared by all operations.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub version: DocVersion,
    /// Root URL of the documentation edition
    pub base_url: String,
    pub total_results: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    /// Ranked hits skipped before `hits`
    pub offset: usize,
    pub hits: Vec<SearchHit>,
    /// Pages considered
    pub pages_searched: usize,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocStructure {
    pub tree: DirectoryTree,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocContent {
    pub url: String,
    pub path: String,
    pub title: String,
    /// Top-level section the page belongs to ("api-reference", ...)
    pub section: String,
    pub content: String,
    /// Length of `content` in characters
    pub content_length: usize,
    /// Same-tree pages this one links to
    pub links: Vec<String>,
    pub has_api_section: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiReferences {
    pub component: String,
    pub references: Vec<ApiReference>,
    /// Where the API reference crawl started
    pub search_url: String,
    pub pages_scanned: usize,
    pub metadata: Metadata,
}

/// Documentation explorer for one version, over a shared page cache.
///
/// Cloning is cheap and shares cache and crawled trees.
#[derive(Clone)]
pub struct Explorer {
    base_url: Url,
    root: DocRoot,
    cache: Arc<PageCache>,
    index: Arc<StructureIndex>,
    config: ExplorerConfig,
}

impl fmt::Debug for Explorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Explorer")
            .field("root", &self.root.root_url().as_str())
            .field("cached_pages", &self.cache.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Explorer {
    /// Explorer over `cache`, which must load pages under `base_url`.
    pub fn new(base_url: Url, version: DocVersion, cache: Arc<PageCache>, config: ExplorerConfig) -> Result<Self, Error> {
        let root = DocRoot::new(&base_url, version)?;
        let index = Arc::new(StructureIndex::new(Arc::clone(&cache), config.crawl.clone(), config.structure_ttl));

        Ok(Self { base_url, root, cache, index, config })
    }

    /// Wire fetcher, page source, cache and explorer from application config.
    pub fn from_config(config: &AppConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let configured = config.base_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let base_url = canonicalize(configured.as_str()).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let source = FetchingSource::new(fetcher, base_url.clone());
        let cache = Arc::new(PageCache::new(Arc::new(source), config.cache_config()));

        Self::new(base_url, config.doc_version(), cache, ExplorerConfig::from(config))
    }

    /// The same explorer for another version.
    ///
    /// Cache and crawled trees are shared; nothing cached for the current
    /// version is evicted by switching.
    pub fn with_version(&self, version: DocVersion) -> Result<Self, Error> {
        Ok(Self {
            base_url: self.base_url.clone(),
            root: DocRoot::new(&self.base_url, version)?,
            cache: Arc::clone(&self.cache),
            index: Arc::clone(&self.index),
            config: self.config.clone(),
        })
    }

    pub fn root(&self) -> &DocRoot {
        &self.root
    }

    pub fn version(&self) -> &DocVersion {
        self.root.version()
    }

    pub fn cache(&self) -> &Arc<PageCache> {
        &self.cache
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Keyword search over the section index pages and every cached page of this version.
    ///
    /// `limit` can lower, never raise, the configured result cap. `offset` skips
    /// that many ranked hits first; `metadata.total_results` counts every match.
    pub async fn search_docs(&self, query: &str, limit: Option<usize>, offset: usize) -> Result<SearchResults, Error> {
        let query = Query::parse(query, self.config.max_query_length)?;
        let limit = limit.unwrap_or(self.config.max_results).min(self.config.max_results);
        let started = Instant::now();

        self.bounded("search_docs", async {
            let corpus = self.search_corpus().await?;
            let ranked = search::rank(&query, &corpus);
            let matched = ranked.len();
            let hits: Vec<_> = ranked.into_iter().skip(offset).take(limit).collect();

            tracing::info!("search for {:?} matched {} of {} pages", query.as_str(), matched, corpus.len());

            Ok(SearchResults {
                query: query.as_str().to_string(),
                offset,
                pages_searched: corpus.len(),
                metadata: self.metadata(matched, started),
                hits,
            })
        })
        .await
    }

    /// Directory tree crawled from the documentation index.
    pub async fn get_doc_structure(&self) -> Result<DocStructure, Error> {
        let start = self.root.resolve(STRUCTURE_START)?;
        let started = Instant::now();

        self.bounded("get_doc_structure", async {
            let tree = self.index.tree(&start, false).await?;
            Ok(DocStructure { metadata: self.metadata(tree.pages, started), tree: DirectoryTree::clone(&tree) })
        })
        .await
    }

    /// Title and text of one document.
    pub async fn read_doc(&self, file_path: &str) -> Result<DocContent, Error> {
        let location = self.root.resolve_document(file_path)?;

        self.bounded("read_doc", async {
            let page = self.cache.get_or_fetch(&location).await?;
            Ok(doc_content(&page))
        })
        .await
    }

    /// Like [`Explorer::read_doc`] but always re-fetches; a failed re-fetch
    /// serves the previous copy if there is one.
    pub async fn refresh_doc(&self, file_path: &str) -> Result<DocContent, Error> {
        let location = self.root.resolve_document(file_path)?;

        self.bounded("refresh_doc", async {
            let page = self.cache.refresh(&location).await?;
            Ok(doc_content(&page))
        })
        .await
    }

    /// Pages of the API reference documenting `component`, best first.
    pub async fn find_api_references(&self, component: &str) -> Result<ApiReferences, Error> {
        Query::parse(component, self.config.max_query_length)?;
        let start = self.root.resolve(API_REFERENCE_INDEX)?;
        let started = Instant::now();

        self.bounded("find_api_references", async {
            let tree = self.index.tree(&start, true).await?;
            let corpus = self.load_all(tree.locations()).await;

            let mut references = api::find_references(component, &corpus, self.config.max_query_length)?;
            references.truncate(self.config.max_results);

            Ok(ApiReferences {
                component: component.trim().to_string(),
                search_url: start.url().to_string(),
                pages_scanned: corpus.len(),
                metadata: self.metadata(references.len(), started),
                references,
            })
        })
        .await
    }

    /// Drop everything cached for this version, pages and trees alike.
    pub fn invalidate(&self) -> usize {
        self.index.invalidate_version(self.version());
        self.cache.invalidate_version(self.version())
    }

    /// Section pages plus resident pages, each once. Fails only if nothing at all is searchable.
    async fn search_corpus(&self) -> Result<Vec<Arc<ParsedPage>>, Error> {
        let sections: Vec<DocLocation> = self
            .config
            .search_sections
            .iter()
            .filter_map(|path| self.root.resolve(path).ok())
            .collect();

        let loads = join_all(sections.iter().map(|location| self.cache.get_or_fetch(location))).await;

        let mut corpus = Vec::with_capacity(loads.len());
        let mut first_error = None;
        for (location, result) in sections.iter().zip(loads) {
            match result {
                Ok(page) => corpus.push(page),
                Err(err) => {
                    tracing::warn!("search section {} unavailable: {}", location, err);
                    first_error.get_or_insert(err);
                }
            }
        }

        corpus.extend(self.cache.pages(self.version()));
        let mut seen = HashSet::new();
        corpus.retain(|page| seen.insert(page.location.path().to_string()));

        match first_error {
            Some(err) if corpus.is_empty() => Err(err),
            _ => Ok(corpus),
        }
    }

    /// Load every location through the cache, skipping failures.
    async fn load_all(&self, locations: Vec<DocLocation>) -> Vec<Arc<ParsedPage>> {
        let concurrency = self.config.crawl.concurrency.max(1);
        stream::iter(locations)
            .map(|location| async move {
                match self.cache.get_or_fetch(&location).await {
                    Ok(page) => Some(page),
                    Err(err) => {
                        tracing::warn!("skipping {}: {}", location, err);
                        None
                    }
                }
            })
            .buffered(concurrency)
            .filter_map(|page| async move { page })
            .collect()
            .await
    }

    async fn bounded<T>(&self, operation: &str, work: impl Future<Output = Result<T, Error>>) -> Result<T, Error> {
        let budget = self.config.request_timeout;
        tokio::time::timeout(budget, work).await.map_err(|_| {
            tracing::warn!("{} gave up after {}ms", operation, budget.as_millis());
            Error::FetchTimeout(format!("{operation} did not complete within {}ms", budget.as_millis()))
        })?
    }

    fn metadata(&self, total_results: usize, started: Instant) -> Metadata {
        Metadata {
            version: self.version().clone(),
            base_url: self.root.root_url().to_string(),
            total_results,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

fn doc_content(page: &ParsedPage) -> DocContent {
    DocContent {
        url: page.location.url().to_string(),
        path: page.location.path().to_string(),
        title: page.title.clone(),
        section: section_of(&page.location).to_string(),
        content: page.text.clone(),
        content_length: page.text.chars().count(),
        links: page.links.iter().map(|l| l.location.path().to_string()).collect(),
        has_api_section: page.has_api_section(),
    }
}

/// Top-level directory of a page, or "documentation" for top-level pages.
fn section_of(location: &DocLocation) -> &str {
    if location.directory().is_empty() {
        return "documentation";
    }
    location.segments().next().unwrap_or("documentation")
}
