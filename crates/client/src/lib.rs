//! Client code for the ESP-IDF docs explorer.
//!
//! This crate provides the HTTP fetch pipeline, HTML extraction, the structure
//! crawl, search and API lookup, and the [`Explorer`] that ties them together
//! for the server.

pub mod api;
pub mod explorer;
pub mod extract;
pub mod fetch;
pub mod index;
pub mod search;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiReference, candidates, find_references};
pub use explorer::{ApiReferences, DocContent, DocStructure, Explorer, ExplorerConfig, Metadata, SearchResults};
pub use extract::{Extraction, extract};
pub use fetch::{FetchConfig, FetchedPage, Fetcher, HttpFetcher, RetryPolicy};
pub use index::{CrawlLimits, DirectoryNode, DirectoryTree, StructureIndex, crawl};
pub use search::{Query, SearchHit, search};
pub use source::FetchingSource;
