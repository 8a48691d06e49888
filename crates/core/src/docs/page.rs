//! Parsed documentation pages.

use chrono::{DateTime, Utc};

use super::DocLocation;

/// A same-tree link and its anchor text.
#[derive(Debug, Clone, PartialEq)]
pub struct DocLink {
    pub location: DocLocation,
    /// Visible anchor text, whitespace collapsed (may be empty)
    pub text: String,
}

impl DocLink {
    pub fn new(location: DocLocation, text: impl Into<String>) -> Self {
        Self { location, text: text.into() }
    }
}

/// A fetched page after extraction.
///
/// Immutable once built; a refresh produces a new page that replaces the old
/// cache entry wholesale. Shared read-only as `Arc<ParsedPage>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    /// Where the page lives
    pub location: DocLocation,
    /// Page title (empty when the page has none)
    pub title: String,
    /// Visible text in document order
    pub text: String,
    /// Same-tree outgoing links in document order, deduplicated
    pub links: Vec<DocLink>,
    /// Text of API-reference regions (signatures, struct/enum blocks)
    pub api_text: String,
    /// Size of the fetched body in bytes
    pub size: usize,
    /// When the page was derived from its fetch
    pub derived_at: DateTime<Utc>,
}

impl ParsedPage {
    /// Whether the page carries any API-reference region.
    pub fn has_api_section(&self) -> bool {
        !self.api_text.is_empty()
    }
}
