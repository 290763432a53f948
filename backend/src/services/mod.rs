pub mod analytics;
pub mod cache_keys;
pub mod catalog;
pub mod entity_cache;
pub mod health;
pub mod jobs;
pub mod kv_store;
pub mod memory_repository;
pub mod memory_store;
pub mod repository;

pub use analytics::{
    AnalyticsError, AnalyticsService, DEFAULT_TOP_LIMIT, ViewCounts, ViewTarget, leaderboard_key,
    view_counter_key, window_sentinel_key,
};
pub use cache_keys::CacheKey;
pub use catalog::{ChapterService, MangaService, PageService};
pub use entity_cache::{
    CacheMetrics, CacheMetricsSummary, CacheTtlPolicy, EntityCache, EntityCacheConfig,
};
pub use health::{ComponentHealth, HealthService, HealthStatus, SystemHealth};
pub use jobs::{LeaderboardResetJob, LeaderboardResetJobConfig, run_window_rollover};
pub use kv_store::{KeyValueStore, KvError, RedisConfig, RedisStore};
pub use memory_repository::InMemoryCatalog;
pub use memory_store::InMemoryStore;
pub use repository::{
    ChapterRepository, MangaRepository, PageRepository, PgChapterRepository, PgMangaRepository,
    PgPageRepository, Repositories, RepositoryError,
};
