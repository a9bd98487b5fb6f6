//! Redis-backed [`KeyValueStore`].
//!
//! Values are stored as JSON text. Counters are plain Redis integers, which
//! read back as JSON numbers.

use std::time::Duration;

use ::redis::{AsyncCommands, Client, Script, aio::ConnectionManager};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::{KeyValueStore, Result, StoreError};

const INCREMENT_SCRIPT: &str = r#"
local next = redis.call('INCRBY', KEYS[1], ARGV[1])
redis.call('EXPIRE', KEYS[1], ARGV[2])
return next
"#;

// Returns nil (refused) when a positive delta would pass the ceiling.
const INCREMENT_WITHIN_SCRIPT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local delta = tonumber(ARGV[1])
local next = current + delta
if delta > 0 and next > tonumber(ARGV[2]) then
  return false
end
redis.call('SET', KEYS[1], next, 'EX', ARGV[3])
return next
"#;

/// Redis implementation of [`KeyValueStore`].
///
/// Key format: `{prefix}:{key}`
#[derive(Clone)]
pub struct RedisKeyValueStore {
    conn: ConnectionManager,
    key_prefix: String,
    increment: Script,
    increment_within: Script,
}

impl RedisKeyValueStore {
    /// Connects to Redis at `url`. `key_prefix` defaults to "fulfillment".
    pub async fn new(url: &str, key_prefix: Option<&str>) -> Result<Self> {
        let client = Client::open(url).map_err(cache_error)?;
        let conn = ConnectionManager::new(client).await.map_err(cache_error)?;

        info!(url = %url, "Connected to Redis cache");

        Ok(Self {
            conn,
            key_prefix: key_prefix.unwrap_or("fulfillment").to_string(),
            increment: Script::new(INCREMENT_SCRIPT),
            increment_within: Script::new(INCREMENT_WITHIN_SCRIPT),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

fn cache_error(e: ::redis::RedisError) -> StoreError {
    StoreError::Cache(e.to_string())
}

// Redis rejects a zero expiry.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.full_key(key)).await.map_err(cache_error)?;
        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let text = serde_json::to_string(&value)?;
        let _: () = conn
            .set_ex(self.full_key(key), text, ttl_secs(ttl))
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(self.full_key(key)).await.map_err(cache_error)?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists(self.full_key(key)).await.map_err(cache_error)
    }

    async fn increment(&self, key: &str, delta: i64, ttl: Duration) -> Result<i64> {
        let mut conn = self.conn.clone();
        self.increment
            .key(self.full_key(key))
            .arg(delta)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(cache_error)
    }

    async fn increment_within(
        &self,
        key: &str,
        delta: i64,
        ceiling: i64,
        ttl: Duration,
    ) -> Result<Option<i64>> {
        let mut conn = self.conn.clone();
        self.increment_within
            .key(self.full_key(key))
            .arg(delta)
            .arg(ceiling)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(cache_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_never_zero() {
        assert_eq!(ttl_secs(Duration::from_millis(200)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(1800)), 1800);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_URL"]
    async fn test_counter_roundtrip_against_redis() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let store = RedisKeyValueStore::new(&url, Some("fulfillment-test")).await.unwrap();
        let key = format!("counter:{}", uuid::Uuid::new_v4());
        let ttl = Duration::from_secs(30);

        assert_eq!(store.increment(&key, 5, ttl).await.unwrap(), 5);
        assert_eq!(store.increment_within(&key, 3, 7, ttl).await.unwrap(), None);
        assert_eq!(store.increment_within(&key, 2, 7, ttl).await.unwrap(), Some(7));
        assert_eq!(store.get(&key).await.unwrap(), Some(Value::from(7)));
        assert!(store.delete(&key).await.unwrap());
        assert!(!store.exists(&key).await.unwrap());
    }
}
