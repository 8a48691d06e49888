//! Breadth-first structure crawl through the page cache.

use futures_util::stream::{self, StreamExt};
use idfdocs_core::{DocLocation, Error, PageCache, ParsedPage};
use std::collections::HashSet;
use std::sync::Arc;

use super::tree::{DirectoryTree, node_key};

/// Bounds for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlLimits {
    /// Link depth followed from the start page (default: 3)
    pub max_depth: usize,

    /// Page fetches attempted at most, the start page included (default: 50)
    pub max_pages: usize,

    /// Concurrent fetches within one level (default: 4)
    pub concurrency: usize,

    /// Only follow links under the start page's directory (default: false)
    pub subtree_only: bool,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self { max_depth: 3, max_pages: 50, concurrency: 4, subtree_only: false }
    }
}

/// Crawl from `start`, level by level, building a directory tree.
///
/// Paths are visited at most once. Within a level, pages are fetched with
/// bounded concurrency but merged in discovery order, so the same site always
/// yields the same tree. A failing start page fails the crawl; any other
/// failure is recorded in the tree and its links are not followed.
pub async fn crawl(cache: &PageCache, start: &DocLocation, limits: &CrawlLimits) -> Result<DirectoryTree, Error> {
    let start_page = cache.get_or_fetch(start).await?;

    let scope = limits.subtree_only.then(|| start.directory().to_string());
    let mut tree = DirectoryTree::new();
    let mut visited = HashSet::from([node_key(start.path())]);
    let mut attempted = 1;

    tree.insert(&start_page);
    let mut level = vec![start_page];

    for depth in 0..limits.max_depth {
        let mut frontier = Vec::new();

        'collect: for page in &level {
            for link in &page.links {
                let location = &link.location;
                if let Some(scope) = &scope
                    && !location.path().starts_with(scope.as_str())
                {
                    continue;
                }
                let key = node_key(location.path());
                if visited.contains(&key) {
                    continue;
                }
                if attempted >= limits.max_pages {
                    tree.truncated = true;
                    break 'collect;
                }

                visited.insert(key);
                attempted += 1;
                frontier.push(location.clone());
            }
        }

        if frontier.is_empty() {
            break;
        }

        tracing::debug!("crawling {} pages at depth {} from {}", frontier.len(), depth + 1, start);

        let results: Vec<(DocLocation, Result<Arc<ParsedPage>, Error>)> = stream::iter(frontier)
            .map(|location| async move {
                let result = cache.get_or_fetch(&location).await;
                (location, result)
            })
            .buffered(limits.concurrency.max(1))
            .collect()
            .await;

        level = Vec::with_capacity(results.len());
        for (location, result) in results {
            match result {
                Ok(page) => {
                    tree.insert(&page);
                    level.push(page);
                }
                Err(err) => {
                    tracing::warn!("skipping {} during crawl: {}", location, err);
                    tree.record_failure(&location, &err);
                }
            }
        }

        if tree.truncated {
            break;
        }
    }

    tracing::debug!(
        "crawl from {} finished: {} pages, {} failed, truncated: {}",
        start,
        tree.pages,
        tree.failed.len(),
        tree.truncated
    );

    Ok(tree)
}
