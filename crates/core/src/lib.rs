//! Core types and shared functionality for the ESP-IDF docs explorer.
//!
//! This crate provides:
//! - Documentation model (versions, sandboxed locations, parsed pages)
//! - In-memory page cache with single-flight loading
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod docs;
pub mod error;

pub use cache::{CacheConfig, PageCache, PageSource};
pub use config::AppConfig;
pub use docs::{DocLink, DocLocation, DocRoot, DocVersion, ParsedPage};
pub use error::Error;
