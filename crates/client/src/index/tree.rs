//! Directory tree built from crawled page paths.

use idfdocs_core::{DocLocation, ParsedPage};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Pages named like this stand for their directory.
const INDEX_PAGE: &str = "index.html";

/// Tree position of a page path: its segments, with a trailing `index.html` dropped.
///
/// `dir/`, `dir` and `dir/index.html` share one key, as they share one node.
pub(crate) fn node_key(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.last() == Some(&INDEX_PAGE) {
        segments.pop();
    }
    segments.join("/")
}

/// One directory or page in the documentation tree.
///
/// A node refers to its page by location only; the page itself stays in the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectoryNode {
    pub name: String,

    #[serde(
        rename = "url",
        serialize_with = "serialize_location_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<DocLocation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, DirectoryNode>,
}

fn serialize_location_url<S: Serializer>(location: &Option<DocLocation>, serializer: S) -> Result<S::Ok, S::Error> {
    location.as_ref().map(|l| l.url().as_str()).serialize(serializer)
}

impl DirectoryNode {
    fn named(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    /// Node at `segments` below this one, if present.
    pub fn find<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Option<&DirectoryNode> {
        segments.into_iter().try_fold(self, |node, segment| node.children.get(segment))
    }

    /// Number of nodes carrying a page, this one included.
    pub fn page_count(&self) -> usize {
        usize::from(self.location.is_some()) + self.children.values().map(DirectoryNode::page_count).sum::<usize>()
    }
}

/// A crawl path that failed to load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedPage {
    pub path: String,
    pub error: String,
}

/// Result of one structure crawl.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryTree {
    pub root: DirectoryNode,

    /// Pages successfully loaded into the tree
    pub pages: usize,

    /// Whether the page cap stopped the crawl with links still unvisited
    pub truncated: bool,

    /// Non-start pages that failed to load and were skipped
    pub failed: Vec<FailedPage>,
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self { root: DirectoryNode::named(""), pages: 0, truncated: false, failed: Vec::new() }
    }
}

impl DirectoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a page at its path. `dir/index.html` and `dir/` both attach to the `dir` node.
    pub fn insert(&mut self, page: &ParsedPage) {
        let mut segments: Vec<&str> = page.location.segments().collect();
        if segments.last() == Some(&INDEX_PAGE) {
            segments.pop();
        }

        let mut node = &mut self.root;
        for segment in segments {
            node = node.children.entry(segment.to_string()).or_insert_with(|| DirectoryNode::named(segment));
        }

        if node.location.is_none() {
            self.pages += 1;
        }
        node.location = Some(page.location.clone());
        node.title = (!page.title.is_empty()).then(|| page.title.clone());
    }

    pub fn record_failure(&mut self, location: &DocLocation, error: &idfdocs_core::Error) {
        self.failed.push(FailedPage { path: location.path().to_string(), error: error.to_string() });
    }

    /// Every page location in the tree, parents before children, siblings by name.
    pub fn locations(&self) -> Vec<DocLocation> {
        let mut out = Vec::with_capacity(self.pages);
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            out.extend(node.location.clone());
            stack.extend(node.children.values().rev());
        }
        out
    }

    /// Node for a page path relative to the root (`""` for the root itself).
    pub fn find(&self, path: &str) -> Option<&DirectoryNode> {
        let key = node_key(path);
        self.root.find(key.split('/').filter(|s| !s.is_empty()))
    }
}
