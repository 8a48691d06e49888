//! Structure indexing: crawled directory trees, memoized per start page.

pub mod crawl;
pub mod tree;

pub use crawl::{CrawlLimits, crawl};
pub use tree::{DirectoryNode, DirectoryTree, FailedPage};

use idfdocs_core::{DocLocation, DocVersion, Error, PageCache};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TreeKey {
    version: DocVersion,
    start: String,
    subtree_only: bool,
}

struct MemoTree {
    tree: Arc<DirectoryTree>,
    built_at: Instant,
}

/// Crawled trees, reused until they are older than `ttl`.
///
/// Only complete crawls (no failed pages) are remembered, so a transient
/// failure is retried on the next request.
pub struct StructureIndex {
    cache: Arc<PageCache>,
    limits: CrawlLimits,
    ttl: Duration,
    trees: Mutex<HashMap<TreeKey, MemoTree>>,
}

impl StructureIndex {
    pub fn new(cache: Arc<PageCache>, limits: CrawlLimits, ttl: Duration) -> Self {
        Self { cache, limits, ttl, trees: Mutex::new(HashMap::new()) }
    }

    /// Tree crawled from `start`, from memory when recent enough.
    pub async fn tree(&self, start: &DocLocation, subtree_only: bool) -> Result<Arc<DirectoryTree>, Error> {
        let key = TreeKey { version: start.version().clone(), start: start.path().to_string(), subtree_only };

        let memoized = {
            let trees = self.trees.lock().unwrap_or_else(PoisonError::into_inner);
            trees
                .get(&key)
                .filter(|memo| memo.built_at.elapsed() < self.ttl)
                .map(|memo| Arc::clone(&memo.tree))
        };

        if let Some(tree) = memoized {
            tracing::debug!("reusing crawled tree for {}", start);
            return Ok(tree);
        }

        let limits = CrawlLimits { subtree_only, ..self.limits.clone() };
        let tree = Arc::new(crawl(&self.cache, start, &limits).await?);

        if tree.failed.is_empty() {
            self.trees
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, MemoTree { tree: Arc::clone(&tree), built_at: Instant::now() });
        }

        Ok(tree)
    }

    /// Forget every tree of one version.
    pub fn invalidate_version(&self, version: &DocVersion) {
        self.trees
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| &key.version != version);
    }

    pub fn cache(&self) -> &Arc<PageCache> {
        &self.cache
    }

    pub fn limits(&self) -> &CrawlLimits {
        &self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFetcher, cache, html_page, root};

    fn fetcher() -> Arc<StubFetcher> {
        Arc::new(
            StubFetcher::new()
                .page("index.html", html_page("Index", "", &["a.html", "b.html"]))
                .page("a.html", html_page("A", "", &[]))
                .page("b.html", html_page("B", "", &[])),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_tree_is_memoized() {
        let fetcher = fetcher();
        let index = StructureIndex::new(cache(Arc::clone(&fetcher)), CrawlLimits::default(), Duration::from_secs(60));
        let start = root().resolve("index.html").unwrap();

        let first = index.tree(&start, false).await.unwrap();
        index.cache().invalidate_version(start.version());
        let second = index.tree(&start, false).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memo_expires() {
        let fetcher = fetcher();
        let index = StructureIndex::new(cache(Arc::clone(&fetcher)), CrawlLimits::default(), Duration::from_secs(60));
        let start = root().resolve("index.html").unwrap();

        let first = index.tree(&start, false).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        let second = index.tree(&start, false).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_incomplete_tree_not_memoized() {
        let fetcher = Arc::new(StubFetcher::new().page("index.html", html_page("Index", "", &["gone.html"])));
        let index = StructureIndex::new(cache(Arc::clone(&fetcher)), CrawlLimits::default(), Duration::from_secs(60));
        let start = root().resolve("index.html").unwrap();

        let first = index.tree(&start, false).await.unwrap();
        assert_eq!(first.failed.len(), 1);

        fetcher.set("gone.html", Ok(html_page("Back", "", &[])));
        let second = index.tree(&start, false).await.unwrap();
        assert!(second.failed.is_empty());
        assert_eq!(second.pages, 2);
    }

    #[tokio::test]
    async fn test_invalidate_version() {
        let fetcher = fetcher();
        let index = StructureIndex::new(cache(Arc::clone(&fetcher)), CrawlLimits::default(), Duration::from_secs(60));
        let start = root().resolve("index.html").unwrap();

        let first = index.tree(&start, false).await.unwrap();
        index.invalidate_version(start.version());
        let second = index.tree(&start, false).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
