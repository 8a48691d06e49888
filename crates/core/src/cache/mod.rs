//! In-memory page cache with single-flight loading.
//!
//! This module provides a bounded, version-partitioned cache of parsed pages.
//! It supports:
//!
//! - Fixed TTL freshness; expired entries stay resident until replaced
//! - Single-flight loads: concurrent misses on one key share one fetch
//! - Stale-while-error: a failed refresh serves the previous page
//! - LRU eviction under capacity pressure, across all versions

pub mod page_cache;
pub mod stats;

pub use crate::Error;

pub use page_cache::{CacheConfig, CacheKey, PageCache, PageSource};
pub use stats::{CacheStats, CacheStatsSnapshot};
