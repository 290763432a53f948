//! Entity Cache Service
//!
//! Read-through, write-invalidate cache for manga, chapter and page
//! lookups, stored as JSON snapshots in the key-value store.
//!
//! Cache failures never fail the enclosing operation:
//! - a store error or an undecodable snapshot on read is a miss
//! - a failed populate is logged and dropped
//! - a failed invalidation is logged; the entry then lives until its TTL

use std::env;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::cache_keys::CacheKey;
use super::kv_store::KeyValueStore;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default TTL for single entity snapshots (5 minutes)
const DEFAULT_DETAIL_TTL_SECS: u64 = 5 * 60;

/// Default TTL for the manga listing (5 minutes)
const DEFAULT_MANGA_LIST_TTL_SECS: u64 = 5 * 60;

/// Default TTL for chapter listings (15 minutes)
const DEFAULT_CHAPTER_LIST_TTL_SECS: u64 = 15 * 60;

/// Default TTL for page listings (30 minutes)
const DEFAULT_PAGE_LIST_TTL_SECS: u64 = 30 * 60;

const ENV_CACHE_ENABLED: &str = "CACHE_ENABLED";
const ENV_DETAIL_TTL: &str = "CACHE_DETAIL_TTL_SECS";
const ENV_MANGA_LIST_TTL: &str = "CACHE_MANGA_LIST_TTL_SECS";
const ENV_CHAPTER_LIST_TTL: &str = "CACHE_CHAPTER_LIST_TTL_SECS";
const ENV_PAGE_LIST_TTL: &str = "CACHE_PAGE_LIST_TTL_SECS";

// ============================================================================
// Cache Configuration
// ============================================================================

/// Expiration per kind of cache entry.
///
/// Listings that change rarely (pages of a published chapter) live longest;
/// entity details, which are edited most often, live shortest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtlPolicy {
    pub detail: Duration,
    pub manga_list: Duration,
    pub chapter_list: Duration,
    pub page_list: Duration,
}

impl Default for CacheTtlPolicy {
    fn default() -> Self {
        Self {
            detail: Duration::from_secs(DEFAULT_DETAIL_TTL_SECS),
            manga_list: Duration::from_secs(DEFAULT_MANGA_LIST_TTL_SECS),
            chapter_list: Duration::from_secs(DEFAULT_CHAPTER_LIST_TTL_SECS),
            page_list: Duration::from_secs(DEFAULT_PAGE_LIST_TTL_SECS),
        }
    }
}

impl CacheTtlPolicy {
    /// TTL for a given key
    pub fn ttl_for(&self, key: &CacheKey) -> Duration {
        match key {
            CacheKey::MangaDetail(_) | CacheKey::ChapterDetail(_) | CacheKey::PageDetail(_) => {
                self.detail
            }
            CacheKey::MangaList => self.manga_list,
            CacheKey::ChapterList { .. } => self.chapter_list,
            CacheKey::PageList { .. } => self.page_list,
        }
    }
}

/// Entity cache configuration
#[derive(Debug, Clone)]
pub struct EntityCacheConfig {
    /// Whether caching is enabled
    pub enabled: bool,

    /// Expiration per entry kind
    pub ttl: CacheTtlPolicy,
}

impl Default for EntityCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: CacheTtlPolicy::default(),
        }
    }
}

impl EntityCacheConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let enabled = env::var(ENV_CACHE_ENABLED)
            .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0"))
            .unwrap_or(true);

        let secs = |name: &str, default: u64| {
            Duration::from_secs(
                env::var(name)
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default),
            )
        };

        Self {
            enabled,
            ttl: CacheTtlPolicy {
                detail: secs(ENV_DETAIL_TTL, DEFAULT_DETAIL_TTL_SECS),
                manga_list: secs(ENV_MANGA_LIST_TTL, DEFAULT_MANGA_LIST_TTL_SECS),
                chapter_list: secs(ENV_CHAPTER_LIST_TTL, DEFAULT_CHAPTER_LIST_TTL_SECS),
                page_list: secs(ENV_PAGE_LIST_TTL, DEFAULT_PAGE_LIST_TTL_SECS),
            },
        }
    }
}

// ============================================================================
// Cache Metrics
// ============================================================================

/// Metrics for cache operations
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Number of cache hits
    pub hits: AtomicU64,

    /// Number of cache misses (including undecodable snapshots)
    pub misses: AtomicU64,

    /// Number of failed store calls on read or populate
    pub store_errors: AtomicU64,

    /// Number of invalidations that could not be applied
    pub invalidation_failures: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation_failure(&self) {
        self.invalidation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn store_error_count(&self) -> u64 {
        self.store_errors.load(Ordering::Relaxed)
    }

    pub fn invalidation_failure_count(&self) -> u64 {
        self.invalidation_failures.load(Ordering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hit_count();
        let total = hits + self.miss_count();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn summary(&self) -> CacheMetricsSummary {
        CacheMetricsSummary {
            hits: self.hit_count(),
            misses: self.miss_count(),
            store_errors: self.store_error_count(),
            invalidation_failures: self.invalidation_failure_count(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// Point-in-time copy of [`CacheMetrics`]
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheMetricsSummary {
    pub hits: u64,
    pub misses: u64,
    pub store_errors: u64,
    pub invalidation_failures: u64,
    pub hit_rate: f64,
}

// ============================================================================
// EntityCache
// ============================================================================

/// Read-through, write-invalidate entity cache
#[derive(Clone)]
pub struct EntityCache {
    store: Arc<dyn KeyValueStore>,
    config: EntityCacheConfig,
    metrics: Arc<CacheMetrics>,
}

impl EntityCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: EntityCacheConfig) -> Self {
        Self {
            store,
            config,
            metrics: Arc::new(CacheMetrics::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Look up a snapshot. Store failures and undecodable payloads are misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if !self.config.enabled {
            return None;
        }

        let raw = match self.store.get(&key.to_storage_key()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.metrics.record_miss();
                debug!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                self.metrics.record_store_error();
                self.metrics.record_miss();
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.metrics.record_hit();
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                self.metrics.record_miss();
                warn!(key = %key, error = %e, "Cached snapshot could not be decoded, treating as miss");
                None
            }
        }
    }

    /// Store a snapshot with the policy TTL for its key
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let ttl = self.config.ttl.ttl_for(key);
        self.put_with_ttl(key, value, ttl).await;
    }

    /// Store a snapshot with an explicit TTL. Failures are logged and dropped.
    pub async fn put_with_ttl<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if !self.config.enabled {
            return;
        }

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize cache snapshot");
                return;
            }
        };

        if let Err(e) = self.store.set(&key.to_storage_key(), &payload, ttl).await {
            self.metrics.record_store_error();
            warn!(key = %key, error = %e, "Failed to populate cache");
        } else {
            debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache populated");
        }
    }

    /// Delete a cache entry.
    ///
    /// A failure leaves a possibly stale entry in place until its TTL runs
    /// out, so it is logged at warn level and counted.
    pub async fn invalidate(&self, key: &CacheKey) {
        if !self.config.enabled {
            return;
        }

        if let Err(e) = self.store.delete(&key.to_storage_key()).await {
            self.metrics.record_invalidation_failure();
            warn!(
                key = %key,
                error = %e,
                ttl_secs = self.config.ttl.ttl_for(key).as_secs(),
                "Failed to invalidate cache entry, stale data possible until TTL expiry"
            );
        } else {
            debug!(key = %key, "Cache entry invalidated");
        }
    }

    /// Delete several cache entries, attempting every one
    pub async fn invalidate_all(&self, keys: &[CacheKey]) {
        for key in keys {
            self.invalidate(key).await;
        }
    }

    /// Read-through lookup.
    ///
    /// Returns the cached snapshot when present; otherwise runs `fetch`,
    /// populates the cache on success and returns the fetched value. Errors
    /// from `fetch` are returned unchanged and nothing is cached.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(&key).await {
            return Ok(cached);
        }

        let value = fetch().await?;
        self.put(&key, &value).await;
        Ok(value)
    }
}
