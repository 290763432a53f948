//! Key-Value Store Adapter
//!
//! Narrow capability interface over the shared key-value store used for
//! entity caching, view counters and leaderboards, plus the Redis-backed
//! implementation.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::info;

/// Environment variable for the Redis URL
const ENV_REDIS_URL: &str = "REDIS_URL";

/// Environment variable for the per-command timeout in milliseconds
const ENV_REDIS_COMMAND_TIMEOUT_MS: &str = "REDIS_COMMAND_TIMEOUT_MS";

/// Default per-command timeout
const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 500;

/// Keys requested per `SCAN` round trip
const SCAN_BATCH: usize = 200;

/// Key-value store errors
#[derive(Debug, Error)]
pub enum KvError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Key-value store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Key-value store unavailable: {0}")]
    Unavailable(String),

    #[error("Operation against a key holding the wrong kind of value: {0}")]
    WrongType(String),

    #[error("Increment would overflow the counter at {0}")]
    Overflow(String),
}

/// Key-value store trait
///
/// Every operation is individually atomic in the store. There are no
/// multi-key transactions. Implementations must be safe for concurrent use.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a string value, `None` when absent
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Set a string value with expiration
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    /// Set a string value with expiration only if the key is absent.
    /// Returns whether the value was written.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
        -> Result<bool, KvError>;

    /// Delete a key of any type (absent keys are not an error)
    async fn delete(&self, key: &str) -> Result<(), KvError>;

    /// Atomically increment a counter, creating it at 0 first when absent
    async fn incr(&self, key: &str) -> Result<i64, KvError>;

    /// Increment a sorted-set member's score, returning the new score
    async fn zincr_by(&self, key: &str, member: &str, delta: f64) -> Result<f64, KvError>;

    /// Sorted-set members by descending score between two ranks (inclusive,
    /// negative ranks count from the end)
    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, f64)>, KvError>;

    /// Remaining time to live, `None` when the key is absent or never expires
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError>;

    /// Connectivity probe
    async fn ping(&self) -> Result<(), KvError>;
}

/// Redis connection configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (empty = not configured)
    pub url: String,

    /// Upper bound on every command round trip
    pub command_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let url = env::var(ENV_REDIS_URL).unwrap_or_default();

        let command_timeout = env::var(ENV_REDIS_COMMAND_TIMEOUT_MS)
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS));

        Self {
            url,
            command_timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Redis-backed store
///
/// Uses a `ConnectionManager`, which multiplexes commands over one
/// connection and reconnects transparently after failures.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    command_timeout: Duration,
}

impl RedisStore {
    /// Connect to Redis
    pub async fn connect(config: &RedisConfig) -> Result<Self, KvError> {
        let client = redis::Client::open(config.url.as_str())?;
        let conn = tokio::time::timeout(config.command_timeout * 10, ConnectionManager::new(client))
            .await
            .map_err(|_| KvError::Timeout(config.command_timeout * 10))??;

        info!(timeout_ms = config.command_timeout.as_millis() as u64, "Connected to Redis");

        Ok(Self {
            conn,
            command_timeout: config.command_timeout,
        })
    }

    /// Keys matching a glob pattern, collected with `SCAN` so the server
    /// is never blocked the way `KEYS` would block it
    pub async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, KvError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor).arg("MATCH").arg(pattern).arg("COUNT").arg(SCAN_BATCH);
            let (next, batch): (u64, Vec<String>) =
                self.bounded(cmd.query_async(&mut conn)).await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    /// Run a command future under the configured timeout
    async fn bounded<T, F>(&self, fut: F) -> Result<T, KvError>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(result) => result.map_err(KvError::from),
            Err(_) => Err(KvError::Timeout(self.command_timeout)),
        }
    }
}

/// Redis rejects zero expirations, so round sub-second TTLs up to one second
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.conn.clone();
        self.bounded(conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        self.bounded(conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl)))
            .await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX").arg("EX").arg(ttl_secs(ttl));
        let reply: Option<String> = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        self.bounded(conn.del::<_, ()>(key)).await
    }

    async fn incr(&self, key: &str) -> Result<i64, KvError> {
        let mut conn = self.conn.clone();
        self.bounded(conn.incr::<_, _, i64>(key, 1)).await
    }

    async fn zincr_by(&self, key: &str, member: &str, delta: f64) -> Result<f64, KvError> {
        let mut conn = self.conn.clone();
        self.bounded(conn.zincr::<_, _, _, f64>(key, member, delta))
            .await
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, f64)>, KvError> {
        let mut conn = self.conn.clone();
        self.bounded(conn.zrevrange_withscores::<_, Vec<(String, f64)>>(key, start, stop))
            .await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError> {
        let mut conn = self.conn.clone();
        // -2: key absent, -1: key without expiration
        let secs: i64 = self.bounded(conn.ttl::<_, i64>(key)).await?;
        if secs < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(secs as u64)))
        }
    }

    async fn ping(&self) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        let cmd = redis::cmd("PING");
        let _pong: String = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(())
    }
}
