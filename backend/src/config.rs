use std::env;

use crate::services::{EntityCacheConfig, LeaderboardResetJobConfig, RedisConfig};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,
    /// Maximum database connections in pool
    pub database_max_connections: u32,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Key-value store connection (unset URL = in-process store)
    pub redis: RedisConfig,
    /// Entity cache switch and TTLs
    pub cache: EntityCacheConfig,
    /// Leaderboard window rollover job
    pub leaderboard_job: LeaderboardResetJobConfig,
    /// Bearer token for the admin endpoints (unset = admin endpoints disabled)
    pub admin_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let admin_token = env::var("ADMIN_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            redis: RedisConfig::from_env(),
            cache: EntityCacheConfig::from_env(),
            leaderboard_job: LeaderboardResetJobConfig::from_env(),
            admin_token,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
