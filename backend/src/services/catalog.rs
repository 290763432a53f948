//! Catalog Services
//!
//! Manga, chapter and page operations: reads go through the entity cache,
//! writes go to the repository and then invalidate every cache entry the
//! write could have made stale. Content views are recorded with the
//! analytics service.
//!
//! Repository errors are returned unchanged. Cache and analytics failures
//! are logged by those layers and never change the result.

use std::sync::Arc;

use tracing::{debug, warn};

use super::analytics::{AnalyticsService, ViewTarget};
use super::cache_keys::CacheKey;
use super::entity_cache::EntityCache;
use super::repository::{ChapterRepository, MangaRepository, PageRepository, RepositoryError};
use crate::models::{
    Chapter, ChapterWithViews, EntityKind, LeaderboardPeriod, Manga, MangaWithViews, NewChapter,
    NewManga, NewPage, Page, PageWithViews,
};

/// Resolve the counter value to show after a view
async fn current_views(
    analytics: &AnalyticsService,
    kind: EntityKind,
    id: i64,
    recorded: Option<i64>,
) -> i64 {
    match recorded {
        Some(count) => count,
        None => analytics.get_view_count(kind, id).await,
    }
}

// ============================================================================
// MangaService
// ============================================================================

#[derive(Clone)]
pub struct MangaService {
    repo: Arc<dyn MangaRepository>,
    chapters: Arc<dyn ChapterRepository>,
    pages: Arc<dyn PageRepository>,
    cache: EntityCache,
    analytics: AnalyticsService,
}

impl MangaService {
    pub fn new(
        repo: Arc<dyn MangaRepository>,
        chapters: Arc<dyn ChapterRepository>,
        pages: Arc<dyn PageRepository>,
        cache: EntityCache,
        analytics: AnalyticsService,
    ) -> Self {
        Self {
            repo,
            chapters,
            pages,
            cache,
            analytics,
        }
    }

    pub async fn list(&self) -> Result<Vec<Manga>, RepositoryError> {
        self.cache
            .get_or_fetch(CacheKey::MangaList, || self.repo.list())
            .await
    }

    /// Manga detail without recording a view
    pub async fn get(&self, id: i64) -> Result<Manga, RepositoryError> {
        self.cache
            .get_or_fetch(CacheKey::MangaDetail(id), || self.repo.get_by_id(id))
            .await
    }

    /// Manga detail for a reader: records the view and merges the count
    pub async fn view(&self, id: i64) -> Result<MangaWithViews, RepositoryError> {
        let manga = self.get(id).await?;
        let counts = self
            .analytics
            .record_view(ViewTarget::Manga { manga_id: id })
            .await;
        let views = current_views(&self.analytics, EntityKind::Manga, id, counts.manga).await;
        Ok(MangaWithViews::new(manga, views))
    }

    /// Leaderboard joined with manga details; `views` is the score within
    /// the period. Entries whose manga no longer exists are skipped.
    pub async fn popular(
        &self,
        period: LeaderboardPeriod,
        limit: Option<i64>,
    ) -> Result<Vec<MangaWithViews>, RepositoryError> {
        let entries = self.analytics.get_top_manga(period, limit).await;

        let mut popular = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.get(entry.manga_id).await {
                Ok(manga) => popular.push(MangaWithViews::new(manga, entry.views)),
                Err(e) if e.is_not_found() => {
                    debug!(manga_id = entry.manga_id, "Skipping ranked manga that no longer exists");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(popular)
    }

    pub async fn create(&self, new: &NewManga) -> Result<Manga, RepositoryError> {
        new.validate().map_err(RepositoryError::Validation)?;
        let manga = self.repo.create(new).await?;
        self.cache.invalidate(&CacheKey::MangaList).await;
        debug!(manga_id = manga.id, "Manga created");
        Ok(manga)
    }

    pub async fn update(&self, id: i64, changes: &NewManga) -> Result<Manga, RepositoryError> {
        changes.validate().map_err(RepositoryError::Validation)?;
        let manga = self.repo.update(id, changes).await?;
        self.cache
            .invalidate_all(&[CacheKey::MangaDetail(id), CacheKey::MangaList])
            .await;
        Ok(manga)
    }

    /// Delete a manga. The store cascades to its chapters and pages, so
    /// their cached details and listings are invalidated as well.
    pub async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let dependents = self.dependent_keys(id).await;
        self.repo.delete(id).await?;

        let mut keys = vec![
            CacheKey::MangaDetail(id),
            CacheKey::MangaList,
            CacheKey::ChapterList { manga_id: id },
        ];
        keys.extend(dependents);
        self.cache.invalidate_all(&keys).await;
        Ok(())
    }

    /// Cache keys of the chapters and pages a manga delete removes.
    /// Read straight from the repository so cached listings cannot hide
    /// anything.
    async fn dependent_keys(&self, manga_id: i64) -> Vec<CacheKey> {
        let chapters = match self.chapters.list_by_manga(manga_id).await {
            Ok(chapters) => chapters,
            Err(e) => {
                warn!(manga_id, error = %e, "Could not enumerate chapters for cache invalidation");
                return Vec::new();
            }
        };

        let mut keys = Vec::new();
        for chapter in chapters {
            keys.extend(chapter_dependent_keys(self.pages.as_ref(), chapter.id).await);
        }
        keys
    }
}

/// Cache keys made stale when a chapter and its pages go away
async fn chapter_dependent_keys(pages: &dyn PageRepository, chapter_id: i64) -> Vec<CacheKey> {
    let mut keys = vec![
        CacheKey::ChapterDetail(chapter_id),
        CacheKey::PageList { chapter_id },
    ];
    match pages.list_by_chapter(chapter_id).await {
        Ok(pages) => keys.extend(pages.into_iter().map(|p| CacheKey::PageDetail(p.id))),
        Err(e) => {
            warn!(chapter_id, error = %e, "Could not enumerate pages for cache invalidation");
        }
    }
    keys
}

// ============================================================================
// ChapterService
// ============================================================================

#[derive(Clone)]
pub struct ChapterService {
    repo: Arc<dyn ChapterRepository>,
    manga: Arc<dyn MangaRepository>,
    pages: Arc<dyn PageRepository>,
    cache: EntityCache,
    analytics: AnalyticsService,
}

impl ChapterService {
    pub fn new(
        repo: Arc<dyn ChapterRepository>,
        manga: Arc<dyn MangaRepository>,
        pages: Arc<dyn PageRepository>,
        cache: EntityCache,
        analytics: AnalyticsService,
    ) -> Self {
        Self {
            repo,
            manga,
            pages,
            cache,
            analytics,
        }
    }

    pub async fn list_by_manga(&self, manga_id: i64) -> Result<Vec<Chapter>, RepositoryError> {
        self.cache
            .get_or_fetch(CacheKey::ChapterList { manga_id }, || {
                self.repo.list_by_manga(manga_id)
            })
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Chapter, RepositoryError> {
        self.cache
            .get_or_fetch(CacheKey::ChapterDetail(id), || self.repo.get_by_id(id))
            .await
    }

    /// Chapter detail for a reader: records a view for the chapter and its manga
    pub async fn view(&self, id: i64) -> Result<ChapterWithViews, RepositoryError> {
        let chapter = self.get(id).await?;
        let counts = self
            .analytics
            .record_view(ViewTarget::Chapter {
                chapter_id: chapter.id,
                manga_id: chapter.manga_id,
            })
            .await;
        let views = current_views(&self.analytics, EntityKind::Chapter, id, counts.chapter).await;
        Ok(ChapterWithViews::new(chapter, views))
    }

    pub async fn create(&self, new: &NewChapter) -> Result<Chapter, RepositoryError> {
        new.validate().map_err(RepositoryError::Validation)?;
        self.manga.get_by_id(new.manga_id).await?;

        let chapter = self.repo.create(new).await?;
        self.cache
            .invalidate(&CacheKey::ChapterList {
                manga_id: chapter.manga_id,
            })
            .await;
        Ok(chapter)
    }

    /// Update a chapter. When it moves to another manga both listings are stale.
    pub async fn update(&self, id: i64, changes: &NewChapter) -> Result<Chapter, RepositoryError> {
        changes.validate().map_err(RepositoryError::Validation)?;
        let previous = self.repo.get_by_id(id).await?;
        let chapter = self.repo.update(id, changes).await?;

        let mut keys = vec![
            CacheKey::ChapterDetail(id),
            CacheKey::ChapterList {
                manga_id: previous.manga_id,
            },
        ];
        if chapter.manga_id != previous.manga_id {
            keys.push(CacheKey::ChapterList {
                manga_id: chapter.manga_id,
            });
        }
        self.cache.invalidate_all(&keys).await;
        Ok(chapter)
    }

    pub async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let previous = self.repo.get_by_id(id).await?;
        let dependents = chapter_dependent_keys(self.pages.as_ref(), id).await;
        self.repo.delete(id).await?;

        let mut keys = vec![CacheKey::ChapterList {
            manga_id: previous.manga_id,
        }];
        keys.extend(dependents);
        self.cache.invalidate_all(&keys).await;
        Ok(())
    }
}

// ============================================================================
// PageService
// ============================================================================

#[derive(Clone)]
pub struct PageService {
    repo: Arc<dyn PageRepository>,
    chapters: ChapterService,
    cache: EntityCache,
    analytics: AnalyticsService,
}

impl PageService {
    pub fn new(
        repo: Arc<dyn PageRepository>,
        chapters: ChapterService,
        cache: EntityCache,
        analytics: AnalyticsService,
    ) -> Self {
        Self {
            repo,
            chapters,
            cache,
            analytics,
        }
    }

    pub async fn list_by_chapter(&self, chapter_id: i64) -> Result<Vec<Page>, RepositoryError> {
        self.cache
            .get_or_fetch(CacheKey::PageList { chapter_id }, || {
                self.repo.list_by_chapter(chapter_id)
            })
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Page, RepositoryError> {
        self.cache
            .get_or_fetch(CacheKey::PageDetail(id), || self.repo.get_by_id(id))
            .await
    }

    /// Record a view of a page the reader has been served, cascading to
    /// its chapter and manga.
    ///
    /// The manga is found through the (cached) chapter detail. If that
    /// lookup fails the view is not counted.
    pub async fn record_view(&self, page: Page) -> PageWithViews {
        let recorded = match self.chapters.get(page.chapter_id).await {
            Ok(chapter) => {
                self.analytics
                    .record_view(ViewTarget::Page {
                        page_id: page.id,
                        chapter_id: chapter.id,
                        manga_id: chapter.manga_id,
                    })
                    .await
                    .page
            }
            Err(e) => {
                warn!(
                    page_id = page.id,
                    chapter_id = page.chapter_id,
                    error = %e,
                    "Could not resolve page ancestry, view not recorded"
                );
                None
            }
        };

        let views = current_views(&self.analytics, EntityKind::Page, page.id, recorded).await;
        PageWithViews::new(page, views)
    }

    pub async fn create(&self, new: &NewPage) -> Result<Page, RepositoryError> {
        new.validate().map_err(RepositoryError::Validation)?;
        let page = self.repo.create(new).await?;
        self.cache
            .invalidate(&CacheKey::PageList {
                chapter_id: page.chapter_id,
            })
            .await;
        Ok(page)
    }

    pub async fn update(&self, id: i64, changes: &NewPage) -> Result<Page, RepositoryError> {
        changes.validate().map_err(RepositoryError::Validation)?;
        let previous = self.repo.get_by_id(id).await?;
        let page = self.repo.update(id, changes).await?;

        let mut keys = vec![
            CacheKey::PageDetail(id),
            CacheKey::PageList {
                chapter_id: previous.chapter_id,
            },
        ];
        if page.chapter_id != previous.chapter_id {
            keys.push(CacheKey::PageList {
                chapter_id: page.chapter_id,
            });
        }
        self.cache.invalidate_all(&keys).await;
        Ok(page)
    }

    pub async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let previous = self.repo.get_by_id(id).await?;
        self.repo.delete(id).await?;
        self.cache
            .invalidate_all(&[
                CacheKey::PageDetail(id),
                CacheKey::PageList {
                    chapter_id: previous.chapter_id,
                },
            ])
            .await;
        Ok(())
    }
}
