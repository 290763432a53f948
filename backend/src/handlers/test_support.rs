//! Shared fixtures for the HTTP tests: the full route table over an
//! in-memory catalog and key-value store.

use std::sync::Arc;

use actix_web::web;

use crate::AppState;
use crate::config::Config;
use crate::services::{
    EntityCacheConfig, HealthService, InMemoryCatalog, InMemoryStore, LeaderboardResetJobConfig,
    RedisConfig,
};

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token";

pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub catalog: InMemoryCatalog,
    pub state: web::Data<AppState>,
    pub health: web::Data<HealthService>,
}

pub fn create_test_config() -> Config {
    Config {
        database_url: String::new(),
        database_max_connections: 5,
        host: "127.0.0.1".to_string(),
        port: 8080,
        redis: RedisConfig::default(),
        cache: EntityCacheConfig::default(),
        leaderboard_job: LeaderboardResetJobConfig::default(),
        admin_token: Some(TEST_ADMIN_TOKEN.to_string()),
    }
}

pub fn create_test_context() -> TestContext {
    let store = Arc::new(InMemoryStore::new());
    let catalog = InMemoryCatalog::new();
    let state = AppState::new(create_test_config(), store.clone(), catalog.repositories());
    let health = HealthService::new(
        None,
        store.clone(),
        state.cache.metrics(),
        state.cache.is_enabled(),
    );

    TestContext {
        store,
        catalog,
        state: web::Data::new(state),
        health: web::Data::new(health),
    }
}
