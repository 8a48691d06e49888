//! Bounded page cache with single-flight loading and stale-while-error refresh.
//!
//! Per-entry lifecycle:
//! `Absent -> Fetching -> Fresh -> Stale -> Fetching -> Fresh | Stale -> Evicted`
//!
//! The map and the in-flight registry sit behind one synchronous mutex that is
//! never held across an `.await`; the page source runs outside the lock so a
//! slow fetch never blocks unrelated keys.

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared, WeakShared};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::stats::{CacheStats, CacheStatsSnapshot};
use crate::Error;
use crate::docs::{DocLocation, DocVersion, ParsedPage};

/// Default maximum number of resident pages.
const DEFAULT_CAPACITY: usize = 256;

/// Default freshness window (1 hour).
const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

type LoadResult = Result<Arc<ParsedPage>, Error>;
type LoadFuture = BoxFuture<'static, LoadResult>;

/// Produces parsed pages on a cache miss (fetch + extract).
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn load(&self, location: &DocLocation) -> Result<ParsedPage, Error>;
}

/// Configuration for the page cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum resident pages across all versions (default: 256)
    pub capacity: usize,

    /// Freshness window before an entry is re-fetched (default: 1h)
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY, ttl: DEFAULT_TTL }
    }
}

/// Cache key: documentation version plus normalized relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub version: DocVersion,
    pub path: String,
}

impl From<&DocLocation> for CacheKey {
    fn from(location: &DocLocation) -> Self {
        Self { version: location.version().clone(), path: location.path().to_string() }
    }
}

struct CacheEntry {
    page: Arc<ParsedPage>,
    stored_at: Instant,
}

struct InFlight {
    id: u64,
    load: WeakShared<LoadFuture>,
}

struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    inflight: HashMap<CacheKey, InFlight>,
    next_flight: u64,
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases a key's single-flight slot when its load finishes or is dropped.
struct FlightGuard {
    state: Arc<Mutex<CacheState>>,
    key: CacheKey,
    id: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if state.inflight.get(&self.key).is_some_and(|flight| flight.id == self.id) {
            state.inflight.remove(&self.key);
        }
    }
}

/// Shared, bounded cache of parsed pages.
///
/// Hand it around as `Arc<PageCache>`; every explorer for every version can use the same one.
pub struct PageCache {
    state: Arc<Mutex<CacheState>>,
    source: Arc<dyn PageSource>,
    ttl: Duration,
    stats: Arc<CacheStats>,
}

impl PageCache {
    /// Create a cache that loads misses from `source`.
    ///
    /// A capacity of 0 is treated as 1.
    pub fn new(source: Arc<dyn PageSource>, config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        let state = CacheState { entries: LruCache::new(capacity), inflight: HashMap::new(), next_flight: 0 };

        Self { state: Arc::new(Mutex::new(state)), source, ttl: config.ttl, stats: Arc::new(CacheStats::new()) }
    }

    /// Return the cached page if fresh, otherwise load it.
    ///
    /// Concurrent callers for the same key share one load and observe the same
    /// `Arc` (or the same error).
    pub async fn get_or_fetch(&self, location: &DocLocation) -> Result<Arc<ParsedPage>, Error> {
        let load = {
            let mut state = lock(&self.state);
            let key = CacheKey::from(location);

            if let Some(entry) = state.entries.get(&key)
                && entry.stored_at.elapsed() < self.ttl
            {
                self.stats.record_hit();
                tracing::debug!("page cache hit for {}", location);
                return Ok(Arc::clone(&entry.page));
            }

            self.stats.record_miss();
            self.join_or_start(&mut state, key, location)
        };

        load.await
    }

    /// Reload a page regardless of freshness.
    ///
    /// Joins a load already in flight for the key. If the reload fails and a
    /// previous page exists, that page is returned instead of the error.
    pub async fn refresh(&self, location: &DocLocation) -> Result<Arc<ParsedPage>, Error> {
        let load = {
            let mut state = lock(&self.state);
            self.join_or_start(&mut state, CacheKey::from(location), location)
        };

        load.await
    }

    /// Resident page for `location`, fresh or stale, without loading or touching LRU order.
    pub fn peek(&self, location: &DocLocation) -> Option<Arc<ParsedPage>> {
        let state = lock(&self.state);
        state
            .entries
            .peek(&CacheKey::from(location))
            .map(|entry| Arc::clone(&entry.page))
    }

    /// All resident pages of one version, ordered by path.
    pub fn pages(&self, version: &DocVersion) -> Vec<Arc<ParsedPage>> {
        let state = lock(&self.state);
        let mut pages: Vec<Arc<ParsedPage>> = state
            .entries
            .iter()
            .filter(|(key, _)| &key.version == version)
            .map(|(_, entry)| Arc::clone(&entry.page))
            .collect();
        pages.sort_by(|a, b| a.location.path().cmp(b.location.path()));
        pages
    }

    /// Drop every resident page of one version. Returns the number removed.
    pub fn invalidate_version(&self, version: &DocVersion) -> usize {
        let mut state = lock(&self.state);
        let keys: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(key, _)| &key.version == version)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            state.entries.pop(key);
        }

        tracing::debug!("invalidated {} cached pages for version {}", keys.len(), version);
        keys.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of loads currently registered as in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.state).inflight.len()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    fn join_or_start(&self, state: &mut CacheState, key: CacheKey, location: &DocLocation) -> Shared<LoadFuture> {
        if let Some(load) = state.inflight.get(&key).and_then(|flight| flight.load.upgrade()) {
            tracing::debug!("joining in-flight load for {}", location);
            return load;
        }

        let id = state.next_flight;
        state.next_flight += 1;

        let load = load_page(
            Arc::clone(&self.source),
            Arc::clone(&self.state),
            Arc::clone(&self.stats),
            key.clone(),
            location.clone(),
            id,
        )
        .boxed()
        .shared();

        if let Some(weak) = load.downgrade() {
            state.inflight.insert(key, InFlight { id, load: weak });
        }

        load
    }
}

async fn load_page(
    source: Arc<dyn PageSource>, shared: Arc<Mutex<CacheState>>, stats: Arc<CacheStats>, key: CacheKey,
    location: DocLocation, id: u64,
) -> LoadResult {
    let _guard = FlightGuard { state: Arc::clone(&shared), key: key.clone(), id };

    stats.record_load();
    let loaded = source.load(&location).await;

    let mut state = lock(&shared);
    let result = match loaded {
        Ok(page) => {
            let page = Arc::new(page);
            let entry = CacheEntry { page: Arc::clone(&page), stored_at: Instant::now() };
            if let Some((evicted, _)) = state.entries.push(key.clone(), entry)
                && evicted != key
            {
                stats.record_eviction();
                tracing::trace!("page cache at capacity, evicted {}", evicted.path);
            }
            Ok(page)
        }
        Err(err) => match state.entries.peek(&key) {
            Some(stale) => {
                stats.record_stale_served();
                tracing::warn!("refresh of {} failed, serving stale page: {}", location, err);
                Ok(Arc::clone(&stale.page))
            }
            None => Err(err),
        },
    };
    drop(state);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use futures_util::future::join_all;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use url::Url;

    use crate::docs::DocRoot;

    struct StubSource {
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
    }

    impl StubSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), fail: AtomicBool::new(false), delay })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource for StubSource {
        async fn load(&self, location: &DocLocation) -> Result<ParsedPage, Error> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Network(format!("connection reset fetching {location}")));
            }
            Ok(ParsedPage {
                location: location.clone(),
                title: format!("{} #{call}", location.path()),
                text: "body".into(),
                links: Vec::new(),
                api_text: String::new(),
                size: 4,
                derived_at: Utc::now(),
            })
        }
    }

    fn root(version: &str) -> DocRoot {
        let base = Url::parse("https://docs.example.com/esp-idf").unwrap();
        DocRoot::new(&base, DocVersion::new(version, None)).unwrap()
    }

    fn cache(source: Arc<StubSource>, capacity: usize) -> PageCache {
        PageCache::new(source, CacheConfig { capacity, ttl: Duration::from_secs(3600) })
    }

    #[tokio::test]
    async fn test_hit_within_ttl_fetches_once() {
        let source = StubSource::new(Duration::ZERO);
        let cache = cache(Arc::clone(&source), 16);
        let loc = root("latest").resolve("api-guides/wifi.html").unwrap();

        let first = cache.get_or_fetch(&loc).await.unwrap();
        let second = cache.get_or_fetch(&loc).await.unwrap();

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.loads, 1);
    }

    #[tokio::test]
    async fn test_concurrent_cold_misses_share_one_fetch() {
        let source = StubSource::new(Duration::from_millis(50));
        let cache = cache(Arc::clone(&source), 16);
        let loc = root("latest").resolve("api-reference/index.html").unwrap();

        let results = join_all((0..16).map(|_| cache.get_or_fetch(&loc))).await;

        assert_eq!(source.calls(), 1);
        let pages: Vec<Arc<ParsedPage>> = results.into_iter().map(Result::unwrap).collect();
        assert!(pages.iter().all(|page| Arc::ptr_eq(page, &pages[0])));
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_share_error() {
        let source = StubSource::new(Duration::from_millis(20));
        source.fail.store(true, Ordering::SeqCst);
        let cache = cache(Arc::clone(&source), 16);
        let loc = root("latest").resolve("missing.html").unwrap();

        let results = join_all((0..4).map(|_| cache.get_or_fetch(&loc))).await;

        assert_eq!(source.calls(), 1);
        assert!(results.iter().all(|r| matches!(r, Err(Error::Network(_)))));
        assert_eq!(cache.in_flight(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_is_retried_on_next_access() {
        let source = StubSource::new(Duration::ZERO);
        source.fail.store(true, Ordering::SeqCst);
        let cache = cache(Arc::clone(&source), 16);
        let loc = root("latest").resolve("index.html").unwrap();

        assert!(cache.get_or_fetch(&loc).await.is_err());
        source.fail.store(false, Ordering::SeqCst);
        assert!(cache.get_or_fetch(&loc).await.is_ok());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refetched() {
        let source = StubSource::new(Duration::ZERO);
        let cache = cache(Arc::clone(&source), 16);
        let loc = root("latest").resolve("index.html").unwrap();

        let first = cache.get_or_fetch(&loc).await.unwrap();
        tokio::time::advance(Duration::from_secs(3601)).await;
        let second = cache.get_or_fetch(&loc).await.unwrap();

        assert_eq!(source.calls(), 2);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.title, "index.html #2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_served_when_refresh_fails() {
        let source = StubSource::new(Duration::ZERO);
        let cache = cache(Arc::clone(&source), 16);
        let loc = root("latest").resolve("index.html").unwrap();

        let first = cache.get_or_fetch(&loc).await.unwrap();
        tokio::time::advance(Duration::from_secs(3601)).await;
        source.fail.store(true, Ordering::SeqCst);

        let second = cache.get_or_fetch(&loc).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.stats().stale_served, 1);
    }

    #[tokio::test]
    async fn test_forced_refresh_failure_serves_previous_page() {
        let source = StubSource::new(Duration::ZERO);
        let cache = cache(Arc::clone(&source), 16);
        let loc = root("latest").resolve("api-guides/wifi.html").unwrap();

        let first = cache.get_or_fetch(&loc).await.unwrap();
        source.fail.store(true, Ordering::SeqCst);

        let refreshed = cache.refresh(&loc).await.unwrap();
        assert!(Arc::ptr_eq(&first, &refreshed));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_forced_refresh_replaces_entry() {
        let source = StubSource::new(Duration::ZERO);
        let cache = cache(Arc::clone(&source), 16);
        let loc = root("latest").resolve("index.html").unwrap();

        let first = cache.get_or_fetch(&loc).await.unwrap();
        let refreshed = cache.refresh(&loc).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &refreshed));

        let after = cache.get_or_fetch(&loc).await.unwrap();
        assert!(Arc::ptr_eq(&refreshed, &after));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let source = StubSource::new(Duration::ZERO);
        let cache = cache(Arc::clone(&source), 2);
        let root = root("latest");
        let a = root.resolve("a.html").unwrap();
        let b = root.resolve("b.html").unwrap();
        let c = root.resolve("c.html").unwrap();

        cache.get_or_fetch(&a).await.unwrap();
        cache.get_or_fetch(&b).await.unwrap();
        cache.get_or_fetch(&a).await.unwrap();
        cache.get_or_fetch(&c).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.peek(&a).is_some());
        assert!(cache.peek(&b).is_none());
        assert!(cache.peek(&c).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_versions_coexist_and_invalidate_separately() {
        let source = StubSource::new(Duration::ZERO);
        let cache = cache(Arc::clone(&source), 16);
        let latest = root("latest");
        let stable = root("v5.1");

        cache.get_or_fetch(&latest.resolve("index.html").unwrap()).await.unwrap();
        cache.get_or_fetch(&latest.resolve("a.html").unwrap()).await.unwrap();
        cache.get_or_fetch(&stable.resolve("index.html").unwrap()).await.unwrap();

        assert_eq!(cache.pages(latest.version()).len(), 2);
        assert_eq!(cache.pages(stable.version()).len(), 1);

        assert_eq!(cache.invalidate_version(latest.version()), 2);
        assert!(cache.pages(latest.version()).is_empty());
        assert_eq!(cache.pages(stable.version()).len(), 1);
    }

    #[tokio::test]
    async fn test_pages_sorted_by_path() {
        let source = StubSource::new(Duration::ZERO);
        let cache = cache(Arc::clone(&source), 16);
        let root = root("latest");
        for path in ["z.html", "a.html", "m/index.html"] {
            cache.get_or_fetch(&root.resolve(path).unwrap()).await.unwrap();
        }

        let paths: Vec<String> = cache
            .pages(root.version())
            .iter()
            .map(|p| p.location.path().to_string())
            .collect();
        assert_eq!(paths, vec!["a.html", "m/index.html", "z.html"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_load_releases_flight() {
        let source = StubSource::new(Duration::from_secs(10));
        let cache = cache(Arc::clone(&source), 16);
        let loc = root("latest").resolve("slow.html").unwrap();

        let timed_out = tokio::time::timeout(Duration::from_secs(1), cache.get_or_fetch(&loc)).await;
        assert!(timed_out.is_err());
        assert_eq!(cache.in_flight(), 0);

        let page = cache.get_or_fetch(&loc).await.unwrap();
        assert_eq!(page.title, "slow.html #2");
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = cache(StubSource::new(Duration::ZERO), 0);
        assert!(cache.is_empty());
    }
}
