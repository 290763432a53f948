//! Redis Integration Tests
//!
//! These tests require a running Redis instance reachable at `REDIS_URL`.
//! Use a throwaway instance: the view tracking test writes to the real
//! leaderboard keys.
//! Run with: `cargo test --test redis_integration_tests -- --ignored`
//!
//! Redis setup:
//! ```bash
//! docker run -d --name redis -p 6379:6379 redis:7
//! export REDIS_URL=redis://127.0.0.1:6379
//! ```

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use manga_reader::services::{CacheKey, EntityCacheConfig, ViewTarget};
use manga_reader::{
    AnalyticsService, EntityCache, KeyValueStore, LeaderboardPeriod, LeaderboardWindow, Manga,
    RedisConfig, RedisStore,
};

async fn connect() -> RedisStore {
    let _ = dotenvy::dotenv();
    let config = RedisConfig {
        url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
        command_timeout: Duration::from_secs(2),
    };
    RedisStore::connect(&config)
        .await
        .expect("Redis must be reachable for integration tests")
}

/// Unique key prefix so parallel runs do not collide
fn test_key(name: &str) -> String {
    format!("test:{}:{name}", Uuid::new_v4())
}

#[tokio::test]
#[ignore]
async fn string_operations_round_trip() {
    let store = connect().await;
    let key = test_key("string");

    assert_eq!(store.get(&key).await.unwrap(), None);
    store.set(&key, "value", Duration::from_secs(30)).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("value"));

    let ttl = store.ttl(&key).await.unwrap().unwrap();
    assert!(ttl <= Duration::from_secs(30) && ttl > Duration::from_secs(20));

    assert!(!store.set_if_absent(&key, "other", Duration::from_secs(30)).await.unwrap());
    store.delete(&key).await.unwrap();
    assert!(store.set_if_absent(&key, "other", Duration::from_secs(30)).await.unwrap());
    store.delete(&key).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn scan_keys_matches_pattern() {
    let store = connect().await;
    let prefix = format!("test:{}", Uuid::new_v4());
    let keys: Vec<String> = (0..3).map(|i| format!("{prefix}:views:{i}")).collect();
    for key in &keys {
        store.set(key, "1", Duration::from_secs(30)).await.unwrap();
    }
    store
        .set(&format!("{prefix}:other"), "1", Duration::from_secs(30))
        .await
        .unwrap();

    let found = store.scan_keys(&format!("{prefix}:views:*")).await.unwrap();
    assert_eq!(found, keys);

    for key in &keys {
        store.delete(key).await.unwrap();
    }
    store.delete(&format!("{prefix}:other")).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn counters_and_sorted_sets() {
    let store = connect().await;
    let counter = test_key("counter");
    let ranking = test_key("ranking");

    assert_eq!(store.incr(&counter).await.unwrap(), 1);
    assert_eq!(store.incr(&counter).await.unwrap(), 2);
    assert_eq!(store.ttl(&counter).await.unwrap(), None);

    store.zincr_by(&ranking, "1", 2.0).await.unwrap();
    store.zincr_by(&ranking, "2", 5.0).await.unwrap();
    assert_eq!(store.zincr_by(&ranking, "1", 1.0).await.unwrap(), 3.0);

    let rows = store.zrevrange_with_scores(&ranking, 0, -1).await.unwrap();
    assert_eq!(rows, vec![("2".to_string(), 5.0), ("1".to_string(), 3.0)]);

    store.delete(&counter).await.unwrap();
    store.delete(&ranking).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn entity_cache_over_redis() {
    let store: Arc<dyn KeyValueStore> = Arc::new(connect().await);
    let cache = EntityCache::new(store, EntityCacheConfig::default());

    // Ids far from anything a dev database would hold
    let id = i64::MAX - (Uuid::new_v4().as_u128() % 1_000_000) as i64;
    let key = CacheKey::MangaDetail(id);
    let manga = Manga {
        id,
        title: "Cached".to_string(),
        description: String::new(),
    };

    cache.put(&key, &manga).await;
    assert_eq!(cache.get::<Manga>(&key).await, Some(manga));

    cache.invalidate(&key).await;
    assert_eq!(cache.get::<Manga>(&key).await, None);
}

#[tokio::test]
#[ignore]
async fn view_tracking_over_redis() {
    let store: Arc<dyn KeyValueStore> = Arc::new(connect().await);
    let analytics = AnalyticsService::new(store);

    let manga_id = i64::MAX - (Uuid::new_v4().as_u128() % 1_000_000) as i64;
    let before = analytics
        .get_view_count(manga_reader::EntityKind::Manga, manga_id)
        .await;

    let counts = analytics
        .record_view(ViewTarget::Manga { manga_id })
        .await;
    assert_eq!(counts.manga, Some(before + 1));

    let top = analytics
        .get_top_manga(LeaderboardPeriod::All, Some(1_000))
        .await;
    assert!(top.iter().any(|entry| entry.manga_id == manga_id));

    let remaining = analytics
        .window_remaining(LeaderboardWindow::Day)
        .await
        .unwrap();
    if let Some(remaining) = remaining {
        assert!(remaining <= LeaderboardWindow::Day.duration());
    }
}
