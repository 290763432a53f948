//! Analytics Service
//!
//! View counters and manga popularity leaderboards on top of the key-value
//! store's atomic increment and sorted-set primitives.
//!
//! A view is attributed to every ancestor of the viewed entity: a page view
//! counts for its chapter, and a chapter view counts for its manga. Every
//! manga view also bumps the manga's score in the all-time, daily, weekly
//! and monthly leaderboards.
//!
//! View tracking is best-effort: each increment is an independent atomic
//! store call, failures are logged per step and never surface to callers.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::kv_store::{KeyValueStore, KvError};
use crate::models::{EntityKind, LeaderboardPeriod, LeaderboardWindow, TopMangaEntry};

/// Default number of leaderboard entries
pub const DEFAULT_TOP_LIMIT: i64 = 10;

/// All-time leaderboard key
const RANKING_ALL_KEY: &str = "ranking:manga";

/// Suffix of the marker key set when a window starts
const WINDOW_SENTINEL_SUFFIX: &str = ":expire";

/// Errors from operator-facing leaderboard operations
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Key-value store error: {0}")]
    Store(#[from] KvError),
}

/// The entity that was viewed, with the ancestry a view propagates to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTarget {
    Manga {
        manga_id: i64,
    },
    Chapter {
        chapter_id: i64,
        manga_id: i64,
    },
    Page {
        page_id: i64,
        chapter_id: i64,
        manga_id: i64,
    },
}

/// Counter values after recording a view. `None` marks a step whose
/// increment failed or that the view did not reach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewCounts {
    pub page: Option<i64>,
    pub chapter: Option<i64>,
    pub manga: Option<i64>,
}

/// Storage key of a view counter
pub fn view_counter_key(kind: EntityKind, id: i64) -> String {
    format!("views:{}:{}", kind.as_str(), id)
}

/// Storage key of a leaderboard
pub fn leaderboard_key(period: LeaderboardPeriod) -> String {
    match period {
        LeaderboardPeriod::All => RANKING_ALL_KEY.to_string(),
        LeaderboardPeriod::Day => format!("{RANKING_ALL_KEY}:daily"),
        LeaderboardPeriod::Week => format!("{RANKING_ALL_KEY}:weekly"),
        LeaderboardPeriod::Month => format!("{RANKING_ALL_KEY}:monthly"),
    }
}

/// Storage key of the marker that tracks a window's lifetime
pub fn window_sentinel_key(window: LeaderboardWindow) -> String {
    format!("{}{WINDOW_SENTINEL_SUFFIX}", leaderboard_key(window.period()))
}

/// View counter and leaderboard engine
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn KeyValueStore>,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Record a view and cascade it to every ancestor.
    ///
    /// A failed step is logged and the remaining steps are still attempted.
    pub async fn record_view(&self, target: ViewTarget) -> ViewCounts {
        let mut counts = ViewCounts::default();

        let (chapter_id, manga_id) = match target {
            ViewTarget::Page {
                page_id,
                chapter_id,
                manga_id,
            } => {
                counts.page = self.increment_counter(EntityKind::Page, page_id).await;
                (Some(chapter_id), manga_id)
            }
            ViewTarget::Chapter {
                chapter_id,
                manga_id,
            } => (Some(chapter_id), manga_id),
            ViewTarget::Manga { manga_id } => (None, manga_id),
        };

        if let Some(chapter_id) = chapter_id {
            counts.chapter = self.increment_counter(EntityKind::Chapter, chapter_id).await;
        }

        counts.manga = self.increment_counter(EntityKind::Manga, manga_id).await;
        self.bump_leaderboards(manga_id).await;

        debug!(?target, ?counts, "Recorded view");
        counts
    }

    /// Increment one view counter, `None` on failure
    async fn increment_counter(&self, kind: EntityKind, id: i64) -> Option<i64> {
        let key = view_counter_key(kind, id);
        match self.store.incr(&key).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(kind = %kind, id, error = %e, "Failed to increment view counter");
                None
            }
        }
    }

    /// Add one to the manga's score in every leaderboard
    async fn bump_leaderboards(&self, manga_id: i64) {
        let member = manga_id.to_string();
        let periods = [
            LeaderboardPeriod::All,
            LeaderboardPeriod::Day,
            LeaderboardPeriod::Week,
            LeaderboardPeriod::Month,
        ];

        for period in periods {
            if let Err(e) = self
                .store
                .zincr_by(&leaderboard_key(period), &member, 1.0)
                .await
            {
                warn!(
                    manga_id,
                    period = %period,
                    error = %e,
                    "Failed to update leaderboard score"
                );
            }
        }
    }

    /// Current view count. Absent or unreadable counters read as 0.
    pub async fn get_view_count(&self, kind: EntityKind, id: i64) -> i64 {
        let key = view_counter_key(kind, id);
        match self.store.get(&key).await {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
                warn!(kind = %kind, id, value = %raw, error = %e, "Unparsable view counter");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!(kind = %kind, id, error = %e, "Failed to read view counter");
                0
            }
        }
    }

    /// Most viewed manga in a period, by descending score.
    ///
    /// A missing or non-positive limit means [`DEFAULT_TOP_LIMIT`]. Order
    /// among equal scores is whatever the store returns. Store failures
    /// yield an empty leaderboard.
    pub async fn get_top_manga(
        &self,
        period: LeaderboardPeriod,
        limit: Option<i64>,
    ) -> Vec<TopMangaEntry> {
        let limit = match limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_TOP_LIMIT,
        };
        let stop = isize::try_from(limit - 1).unwrap_or(isize::MAX);

        let rows = match self
            .store
            .zrevrange_with_scores(&leaderboard_key(period), 0, stop)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(period = %period, error = %e, "Failed to read leaderboard");
                return Vec::new();
            }
        };

        rows.into_iter()
            .filter_map(|(member, score)| match member.parse::<i64>() {
                Ok(manga_id) => Some(TopMangaEntry {
                    manga_id,
                    views: score.round() as i64,
                }),
                Err(e) => {
                    warn!(member = %member, error = %e, "Skipping unparsable leaderboard member");
                    None
                }
            })
            .collect()
    }

    /// Start a fresh window: clear the leaderboard and set the sentinel
    /// with the window's full lifetime.
    pub async fn reset_window(&self, window: LeaderboardWindow) -> Result<(), AnalyticsError> {
        self.store
            .delete(&leaderboard_key(window.period()))
            .await?;
        self.store
            .set(&window_sentinel_key(window), "1", window.duration())
            .await?;

        info!(window = %window, "Leaderboard window reset");
        Ok(())
    }

    /// Reset the window only if it is due, i.e. its sentinel is absent.
    ///
    /// The sentinel is claimed with set-if-absent first, so among several
    /// callers only one clears the leaderboard. If clearing fails the claim
    /// is released so the next poll retries. Returns whether a reset
    /// happened.
    pub async fn reset_window_if_due(
        &self,
        window: LeaderboardWindow,
    ) -> Result<bool, AnalyticsError> {
        let sentinel = window_sentinel_key(window);
        let claimed = self
            .store
            .set_if_absent(&sentinel, "1", window.duration())
            .await?;
        if !claimed {
            return Ok(false);
        }

        if let Err(e) = self.store.delete(&leaderboard_key(window.period())).await {
            if let Err(release) = self.store.delete(&sentinel).await {
                warn!(
                    window = %window,
                    error = %release,
                    "Failed to release window claim, reset delayed until it expires"
                );
            }
            return Err(e.into());
        }

        info!(window = %window, "Leaderboard window rolled over");
        Ok(true)
    }

    /// Time until the window's next reset is due, `None` when due now
    pub async fn window_remaining(
        &self,
        window: LeaderboardWindow,
    ) -> Result<Option<Duration>, AnalyticsError> {
        Ok(self.store.ttl(&window_sentinel_key(window)).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::services::memory_store::InMemoryStore;

    /// Store whose next `failing_deletes` deletes fail
    struct FlakyDeleteStore {
        inner: InMemoryStore,
        failing_deletes: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for FlakyDeleteStore {
        async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
            self.inner.set(key, value, ttl).await
        }

        async fn set_if_absent(
            &self,
            key: &str,
            value: &str,
            ttl: Duration,
        ) -> Result<bool, KvError> {
            self.inner.set_if_absent(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<(), KvError> {
            let remaining = self.failing_deletes.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failing_deletes.store(remaining - 1, Ordering::SeqCst);
                return Err(KvError::Unavailable("delete rejected".to_string()));
            }
            self.inner.delete(key).await
        }

        async fn incr(&self, key: &str) -> Result<i64, KvError> {
            self.inner.incr(key).await
        }

        async fn zincr_by(&self, key: &str, member: &str, delta: f64) -> Result<f64, KvError> {
            self.inner.zincr_by(key, member, delta).await
        }

        async fn zrevrange_with_scores(
            &self,
            key: &str,
            start: isize,
            stop: isize,
        ) -> Result<Vec<(String, f64)>, KvError> {
            self.inner.zrevrange_with_scores(key, start, stop).await
        }

        async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError> {
            self.inner.ttl(key).await
        }

        async fn ping(&self) -> Result<(), KvError> {
            self.inner.ping().await
        }
    }

    fn test_service() -> (Arc<InMemoryStore>, AnalyticsService) {
        let store = Arc::new(InMemoryStore::new());
        let service = AnalyticsService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn test_page_view_cascades_to_chapter_and_manga() {
        let (_store, service) = test_service();

        assert_eq!(service.get_view_count(EntityKind::Manga, 1).await, 0);

        let counts = service
            .record_view(ViewTarget::Page {
                page_id: 10,
                chapter_id: 5,
                manga_id: 1,
            })
            .await;

        assert_eq!(
            counts,
            ViewCounts {
                page: Some(1),
                chapter: Some(1),
                manga: Some(1)
            }
        );
        assert_eq!(service.get_view_count(EntityKind::Page, 10).await, 1);
        assert_eq!(service.get_view_count(EntityKind::Chapter, 5).await, 1);
        assert_eq!(service.get_view_count(EntityKind::Manga, 1).await, 1);

        for period in [
            LeaderboardPeriod::All,
            LeaderboardPeriod::Day,
            LeaderboardPeriod::Week,
            LeaderboardPeriod::Month,
        ] {
            let top = service.get_top_manga(period, Some(10)).await;
            assert_eq!(top, vec![TopMangaEntry { manga_id: 1, views: 1 }]);
        }
    }

    #[tokio::test]
    async fn test_chapter_view_cascades_to_manga_only() {
        let (_store, service) = test_service();

        let counts = service
            .record_view(ViewTarget::Chapter {
                chapter_id: 5,
                manga_id: 1,
            })
            .await;

        assert_eq!(counts.page, None);
        assert_eq!(counts.chapter, Some(1));
        assert_eq!(counts.manga, Some(1));
        assert_eq!(service.get_view_count(EntityKind::Page, 10).await, 0);
    }

    #[tokio::test]
    async fn test_manga_view_touches_only_manga() {
        let (_store, service) = test_service();

        service.record_view(ViewTarget::Manga { manga_id: 2 }).await;
        service.record_view(ViewTarget::Manga { manga_id: 2 }).await;

        assert_eq!(service.get_view_count(EntityKind::Manga, 2).await, 2);
        assert_eq!(service.get_view_count(EntityKind::Chapter, 2).await, 0);
        let top = service.get_top_manga(LeaderboardPeriod::All, None).await;
        assert_eq!(top, vec![TopMangaEntry { manga_id: 2, views: 2 }]);
    }

    #[tokio::test]
    async fn test_views_do_not_leak_between_manga() {
        let (_store, service) = test_service();

        service.record_view(ViewTarget::Manga { manga_id: 1 }).await;
        service.record_view(ViewTarget::Manga { manga_id: 1 }).await;
        service.record_view(ViewTarget::Manga { manga_id: 2 }).await;

        let top = service.get_top_manga(LeaderboardPeriod::All, None).await;
        assert_eq!(
            top,
            vec![
                TopMangaEntry { manga_id: 1, views: 2 },
                TopMangaEntry { manga_id: 2, views: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_top_manga_is_ordered_and_limited() {
        let (_store, service) = test_service();

        for (manga_id, views) in [(1, 3), (2, 7), (3, 1), (4, 5)] {
            for _ in 0..views {
                service.record_view(ViewTarget::Manga { manga_id }).await;
            }
        }

        let top = service.get_top_manga(LeaderboardPeriod::Week, Some(3)).await;
        let ids: Vec<i64> = top.iter().map(|e| e.manga_id).collect();
        assert_eq!(ids, vec![2, 4, 1]);
        assert!(top.windows(2).all(|w| w[0].views >= w[1].views));
    }

    #[tokio::test]
    async fn test_non_positive_limit_uses_default() {
        let (_store, service) = test_service();

        for manga_id in 1..=15 {
            service.record_view(ViewTarget::Manga { manga_id }).await;
        }

        assert_eq!(service.get_top_manga(LeaderboardPeriod::All, Some(0)).await.len(), 10);
        assert_eq!(service.get_top_manga(LeaderboardPeriod::All, Some(-3)).await.len(), 10);
        assert_eq!(service.get_top_manga(LeaderboardPeriod::All, None).await.len(), 10);
        assert_eq!(service.get_top_manga(LeaderboardPeriod::All, Some(12)).await.len(), 12);
    }

    #[tokio::test]
    async fn test_reset_day_window_leaves_other_leaderboards() {
        let (store, service) = test_service();

        service.record_view(ViewTarget::Manga { manga_id: 1 }).await;
        service.reset_window(LeaderboardWindow::Day).await.unwrap();

        assert!(service.get_top_manga(LeaderboardPeriod::Day, Some(10)).await.is_empty());
        assert_eq!(service.get_top_manga(LeaderboardPeriod::All, Some(10)).await.len(), 1);
        assert_eq!(service.get_top_manga(LeaderboardPeriod::Week, Some(10)).await.len(), 1);

        // Counters are untouched by a reset
        assert_eq!(service.get_view_count(EntityKind::Manga, 1).await, 1);

        let sentinel = store
            .ttl(&window_sentinel_key(LeaderboardWindow::Day))
            .await
            .unwrap()
            .unwrap();
        assert!(sentinel > Duration::from_secs(23 * 3600));
    }

    #[tokio::test]
    async fn test_reset_if_due_claims_once() {
        let (_store, service) = test_service();

        service.record_view(ViewTarget::Manga { manga_id: 1 }).await;

        assert!(service.reset_window_if_due(LeaderboardWindow::Week).await.unwrap());
        assert!(service.get_top_manga(LeaderboardPeriod::Week, None).await.is_empty());

        service.record_view(ViewTarget::Manga { manga_id: 1 }).await;
        assert!(!service.reset_window_if_due(LeaderboardWindow::Week).await.unwrap());
        assert_eq!(service.get_top_manga(LeaderboardPeriod::Week, None).await.len(), 1);

        let remaining = service
            .window_remaining(LeaderboardWindow::Week)
            .await
            .unwrap()
            .unwrap();
        assert!(remaining > Duration::from_secs(6 * 24 * 3600));
        assert_eq!(
            service.window_remaining(LeaderboardWindow::Month).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_failed_rollover_is_retried_on_next_poll() {
        let store = Arc::new(FlakyDeleteStore {
            inner: InMemoryStore::new(),
            failing_deletes: AtomicUsize::new(1),
        });
        let service = AnalyticsService::new(store);
        service.record_view(ViewTarget::Manga { manga_id: 1 }).await;

        assert!(service.reset_window_if_due(LeaderboardWindow::Day).await.is_err());
        assert_eq!(
            service.window_remaining(LeaderboardWindow::Day).await.unwrap(),
            None
        );

        assert!(service.reset_window_if_due(LeaderboardWindow::Day).await.unwrap());
        assert!(service.get_top_manga(LeaderboardPeriod::Day, None).await.is_empty());
        assert!(service
            .window_remaining(LeaderboardWindow::Day)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_top_manga_is_stable_between_reads() {
        let (_store, service) = test_service();

        for (manga_id, views) in [(1, 2), (2, 2), (3, 5), (4, 1)] {
            for _ in 0..views {
                service.record_view(ViewTarget::Manga { manga_id }).await;
            }
        }

        for period in [LeaderboardPeriod::All, LeaderboardPeriod::Month] {
            let first = service.get_top_manga(period, Some(10)).await;
            let second = service.get_top_manga(period, Some(10)).await;
            assert_eq!(first, second);
            assert_eq!(first.len(), 4);
        }
    }

    #[tokio::test]
    async fn test_unknown_period_reads_all_time() {
        let (_store, service) = test_service();
        service.record_view(ViewTarget::Manga { manga_id: 4 }).await;

        let period = LeaderboardPeriod::parse_lossy("fortnight");
        let top = service.get_top_manga(period, None).await;
        assert_eq!(top, vec![TopMangaEntry { manga_id: 4, views: 1 }]);
    }

    #[tokio::test]
    async fn test_store_outage_is_non_fatal() {
        let (store, service) = test_service();
        store.set_unavailable(true);

        let counts = service
            .record_view(ViewTarget::Page {
                page_id: 1,
                chapter_id: 1,
                manga_id: 1,
            })
            .await;
        assert_eq!(counts, ViewCounts::default());
        assert_eq!(service.get_view_count(EntityKind::Manga, 1).await, 0);
        assert!(service.get_top_manga(LeaderboardPeriod::All, None).await.is_empty());
        assert!(service.reset_window(LeaderboardWindow::Day).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_step_does_not_stop_cascade() {
        let (store, service) = test_service();

        // A chapter counter holding a non-integer makes that step fail
        store
            .set(&view_counter_key(EntityKind::Chapter, 5), "garbage", Duration::from_secs(60))
            .await
            .unwrap();

        let counts = service
            .record_view(ViewTarget::Page {
                page_id: 10,
                chapter_id: 5,
                manga_id: 1,
            })
            .await;

        assert_eq!(counts.page, Some(1));
        assert_eq!(counts.chapter, None);
        assert_eq!(counts.manga, Some(1));
        assert_eq!(service.get_top_manga(LeaderboardPeriod::All, None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_members_are_skipped() {
        let (store, service) = test_service();
        store
            .zincr_by(&leaderboard_key(LeaderboardPeriod::All), "not-a-number", 9.0)
            .await
            .unwrap();
        service.record_view(ViewTarget::Manga { manga_id: 3 }).await;

        let top = service.get_top_manga(LeaderboardPeriod::All, None).await;
        assert_eq!(top, vec![TopMangaEntry { manga_id: 3, views: 1 }]);
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(view_counter_key(EntityKind::Chapter, 5), "views:chapter:5");
        assert_eq!(leaderboard_key(LeaderboardPeriod::All), "ranking:manga");
        assert_eq!(leaderboard_key(LeaderboardPeriod::Month), "ranking:manga:monthly");
        assert_eq!(
            window_sentinel_key(LeaderboardWindow::Day),
            "ranking:manga:daily:expire"
        );
    }
}
