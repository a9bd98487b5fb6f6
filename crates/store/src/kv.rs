//! Key-value cache with per-key TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{Result, StoreError};

/// A JSON key-value store whose keys expire on their own.
///
/// Expired keys behave exactly like absent keys; no caller ever sweeps them.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the live value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Removes `key`. Returns true if a live value was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Returns true if `key` holds a live value.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically adds `delta` to the integer counter at `key` (absent counts as 0)
    /// and refreshes its TTL. Returns the new value.
    async fn increment(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64>;

    /// Atomically adds a positive `delta` to the counter at `key` only if the result
    /// stays at or below `ceiling`. Returns the new value, or `None` when the
    /// increment was refused and the counter left untouched.
    async fn increment_within(
        &self,
        key: &str,
        delta: i64,
        ceiling: i64,
        ttl: Duration,
    ) -> Result<Option<i64>>;
}

/// Typed convenience methods over any [`KeyValueStore`].
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Reads and deserializes the value at `key`.
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serializes and stores `value` at `key` with the given TTL.
    async fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set_with_ttl(key, value, ttl).await
    }

    /// Reads the integer counter at `key`; absent counts as 0.
    async fn get_counter(&self, key: &str) -> Result<i64> {
        match self.get(key).await? {
            Some(value) => value
                .as_i64()
                .ok_or_else(|| not_an_integer(key)),
            None => Ok(0),
        }
    }
}

fn not_an_integer(key: &str) -> StoreError {
    StoreError::InvalidRecord(format!("counter {key} is not an integer"))
}

// Blanket implementation for all KeyValueStore implementations
impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory TTL cache.
///
/// Uses `tokio::time::Instant`, so tests running on a paused clock can expire
/// keys deterministically with `tokio::time::advance`.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryKeyValueStore {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read fail until reset.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of live keys.
    pub async fn live_keys(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("cache read failed".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("cache write failed".to_string()));
        }
        Ok(())
    }

    fn live_counter(entries: &HashMap<String, CacheEntry>, key: &str, now: Instant) -> Result<i64> {
        match entries.get(key).filter(|entry| entry.is_live(now)) {
            Some(entry) => entry
                .value
                .as_i64()
                .ok_or_else(|| not_an_integer(key)),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.check_read()?;
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        self.check_write()?;
        let expires_at = Instant::now() + ttl;
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check_write()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(key)
            .map(|entry| entry.is_live(now))
            .unwrap_or(false))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check_read()?;
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries.get(key).is_some_and(|entry| entry.is_live(now)))
    }

    async fn increment(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64> {
        self.check_write()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let next = Self::live_counter(&entries, key, now)? + delta;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: Value::from(next),
                expires_at: now + ttl,
            },
        );
        Ok(next)
    }

    async fn increment_within(
        &self,
        key: &str,
        delta: i64,
        ceiling: i64,
        ttl: Duration,
    ) -> Result<Option<i64>> {
        self.check_write()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let next = Self::live_counter(&entries, key, now)? + delta;
        if delta > 0 && next > ceiling {
            return Ok(None);
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: Value::from(next),
                expires_at: now + ttl,
            },
        );
        Ok(Some(next))
    }
}
