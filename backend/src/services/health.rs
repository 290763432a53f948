//! Health Service
//!
//! Reports database and key-value store reachability together with the
//! entity cache counters.
//!
//! The store is optional for serving traffic (cache and analytics degrade
//! silently), so a store outage makes the service `Degraded`, never
//! `Unhealthy`. A database outage is `Unhealthy`.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::services::entity_cache::{CacheMetrics, CacheMetricsSummary};
use crate::services::kv_store::KeyValueStore;

/// Overall system health status
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All components are functioning normally
    Healthy,
    /// Some components have issues but the system is operational
    Degraded,
    /// Critical components are failing
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub database: ComponentHealth,
    pub key_value_store: ComponentHealth,
    pub cache_enabled: bool,
    pub cache: CacheMetricsSummary,
    pub checked_at: DateTime<Utc>,
}

/// Reachability of one backing component
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub status: HealthStatus,
    /// Round trip of the probe in milliseconds
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl ComponentHealth {
    fn from_probe<E: std::fmt::Display>(
        result: Result<(), E>,
        started: Instant,
        failed_status: HealthStatus,
    ) -> Self {
        let latency_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(()) => Self {
                status: HealthStatus::Healthy,
                latency_ms: Some(latency_ms),
                error: None,
            },
            Err(e) => Self {
                status: failed_status,
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Clone)]
pub struct HealthService {
    pool: Option<PgPool>,
    store: Arc<dyn KeyValueStore>,
    cache_metrics: Arc<CacheMetrics>,
    cache_enabled: bool,
}

impl HealthService {
    /// `pool` is `None` when the catalog is not backed by PostgreSQL
    pub fn new(
        pool: Option<PgPool>,
        store: Arc<dyn KeyValueStore>,
        cache_metrics: Arc<CacheMetrics>,
        cache_enabled: bool,
    ) -> Self {
        Self {
            pool,
            store,
            cache_metrics,
            cache_enabled,
        }
    }

    pub async fn check_health(&self) -> SystemHealth {
        let (database, key_value_store) = tokio::join!(self.check_database(), self.check_store());
        let status = Self::determine_overall_status(&database, &key_value_store);

        SystemHealth {
            status,
            database,
            key_value_store,
            cache_enabled: self.cache_enabled,
            cache: self.cache_metrics.summary(),
            checked_at: Utc::now(),
        }
    }

    pub async fn check_database(&self) -> ComponentHealth {
        let Some(pool) = &self.pool else {
            return ComponentHealth {
                status: HealthStatus::Healthy,
                latency_ms: None,
                error: None,
            };
        };

        let started = Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(pool)
            .await
            .map(|_| ());
        ComponentHealth::from_probe(result, started, HealthStatus::Unhealthy)
    }

    pub async fn check_store(&self) -> ComponentHealth {
        let started = Instant::now();
        let result = self.store.ping().await;
        ComponentHealth::from_probe(result, started, HealthStatus::Degraded)
    }

    /// Worst component status wins
    fn determine_overall_status(
        database: &ComponentHealth,
        key_value_store: &ComponentHealth,
    ) -> HealthStatus {
        match (database.status, key_value_store.status) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::InMemoryStore;

    fn service(store: Arc<InMemoryStore>) -> HealthService {
        HealthService::new(None, store, Arc::new(CacheMetrics::new()), true)
    }

    #[tokio::test]
    async fn test_healthy_store() {
        let health = service(Arc::new(InMemoryStore::new())).check_health().await;

        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.key_value_store.status, HealthStatus::Healthy);
        assert!(health.key_value_store.latency_ms.is_some());
    }

    #[tokio::test]
    async fn test_store_outage_degrades() {
        let store = Arc::new(InMemoryStore::new());
        store.set_unavailable(true);

        let health = service(store).check_health().await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(health.key_value_store.error.is_some());
    }

    #[test]
    fn test_overall_status_takes_worst() {
        let component = |status| ComponentHealth {
            status,
            latency_ms: None,
            error: None,
        };

        assert_eq!(
            HealthService::determine_overall_status(
                &component(HealthStatus::Unhealthy),
                &component(HealthStatus::Degraded)
            ),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthService::determine_overall_status(
                &component(HealthStatus::Healthy),
                &component(HealthStatus::Degraded)
            ),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthService::determine_overall_status(
                &component(HealthStatus::Healthy),
                &component(HealthStatus::Healthy)
            ),
            HealthStatus::Healthy
        );
    }
}
