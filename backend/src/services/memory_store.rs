//! In-memory key-value store
//!
//! Process-local implementation of [`KeyValueStore`] with TTL expiry and
//! sorted sets. Used when no Redis URL is configured and as the test fake
//! for the cache layer and the view counter engine.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::kv_store::{KeyValueStore, KvError};

#[derive(Debug, Clone)]
enum StoredValue {
    Text(String),
    Sorted(HashMap<String, f64>),
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory store with Redis-like semantics
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every operation fails while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), KvError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(KvError::Unavailable("in-memory store marked unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    /// Drop the entry for `key` if it has expired
    fn purge_expired(entries: &mut HashMap<String, StoredEntry>, key: &str, now: Instant) {
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
    }
}

/// Resolve Redis-style inclusive rank bounds against a collection length
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.check_available()?;
        let now = Instant::now();
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => match &entry.value {
                StoredValue::Text(s) => Ok(Some(s.clone())),
                StoredValue::Sorted(_) => Err(KvError::WrongType(key.to_string())),
            },
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.check_available()?;
        let entry = StoredEntry {
            value: StoredValue::Text(value.to_string()),
            expires_at: Some(Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, key, now);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            StoredEntry {
                value: StoredValue::Text(value.to_string()),
                expires_at: Some(now + ttl),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.check_available()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, KvError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, key, now);

        let entry = entries.entry(key.to_string()).or_insert_with(|| StoredEntry {
            value: StoredValue::Text("0".to_string()),
            expires_at: None,
        });

        match &mut entry.value {
            StoredValue::Text(s) => {
                let current: i64 = s
                    .parse()
                    .map_err(|_| KvError::WrongType(key.to_string()))?;
                let next = current
                    .checked_add(1)
                    .ok_or_else(|| KvError::Overflow(key.to_string()))?;
                *s = next.to_string();
                Ok(next)
            }
            StoredValue::Sorted(_) => Err(KvError::WrongType(key.to_string())),
        }
    }

    async fn zincr_by(&self, key: &str, member: &str, delta: f64) -> Result<f64, KvError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, key, now);

        let entry = entries.entry(key.to_string()).or_insert_with(|| StoredEntry {
            value: StoredValue::Sorted(HashMap::new()),
            expires_at: None,
        });

        match &mut entry.value {
            StoredValue::Sorted(set) => {
                let score = set.entry(member.to_string()).or_insert(0.0);
                *score += delta;
                Ok(*score)
            }
            StoredValue::Text(_) => Err(KvError::WrongType(key.to_string())),
        }
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, f64)>, KvError> {
        self.check_available()?;
        let now = Instant::now();
        let entries = self.entries.read().await;
        let set = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => match &entry.value {
                StoredValue::Sorted(set) => set,
                StoredValue::Text(_) => return Err(KvError::WrongType(key.to_string())),
            },
            _ => return Ok(Vec::new()),
        };

        // Score descending, ties in reverse lexicographic member order like ZREVRANGE
        let mut members: Vec<(String, f64)> =
            set.iter().map(|(m, s)| (m.clone(), *s)).collect();
        members.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(CmpOrdering::Equal)
                .then_with(|| b.0.cmp(&a.0))
        });

        Ok(match resolve_range(members.len(), start, stop) {
            Some((from, to)) => members[from..=to].to_vec(),
            None => Vec::new(),
        })
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError> {
        self.check_available()?;
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn ping(&self) -> Result<(), KvError> {
        self.check_available()
    }
}
