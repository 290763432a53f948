//! Manga Reader - catalog backend with read-through caching and view analytics
//!
//! This library provides the services, models and HTTP handlers of the
//! manga reader backend.

use std::sync::Arc;

use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::AppError;

pub use models::{
    Chapter, EntityKind, LeaderboardPeriod, LeaderboardWindow, Manga, NewChapter, NewManga,
    NewPage, Page, TopMangaEntry,
};

pub use services::{
    AnalyticsService, ChapterService, EntityCache, HealthService, InMemoryCatalog, InMemoryStore,
    KeyValueStore, KvError, LeaderboardResetJob, LeaderboardResetJobConfig, MangaService,
    PageService, RedisConfig, RedisStore, Repositories,
};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub manga: MangaService,
    pub chapters: ChapterService,
    pub pages: PageService,
    pub analytics: AnalyticsService,
    pub cache: EntityCache,
}

impl AppState {
    /// Wire the catalog services over a key-value store and repositories
    pub fn new(config: Config, store: Arc<dyn KeyValueStore>, repos: Repositories) -> Self {
        let cache = EntityCache::new(store.clone(), config.cache.clone());
        let analytics = AnalyticsService::new(store);

        let manga = MangaService::new(
            repos.manga.clone(),
            repos.chapters.clone(),
            repos.pages.clone(),
            cache.clone(),
            analytics.clone(),
        );
        let chapters = ChapterService::new(
            repos.chapters.clone(),
            repos.manga.clone(),
            repos.pages.clone(),
            cache.clone(),
            analytics.clone(),
        );
        let pages = PageService::new(repos.pages, chapters.clone(), cache.clone(), analytics.clone());

        Self {
            config,
            manga,
            chapters,
            pages,
            analytics,
            cache,
        }
    }
}

/// Open the shared key-value store.
///
/// Without a Redis URL, or when Redis cannot be reached at startup, the
/// service runs on a process-local store: caching and analytics keep
/// working but are not shared between instances.
pub async fn open_store(config: &RedisConfig) -> Arc<dyn KeyValueStore> {
    if !config.is_configured() {
        info!("REDIS_URL not set, using in-process key-value store");
        return Arc::new(InMemoryStore::new());
    }

    match RedisStore::connect(config).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "Redis unavailable at startup, using in-process key-value store");
            Arc::new(InMemoryStore::new())
        }
    }
}
