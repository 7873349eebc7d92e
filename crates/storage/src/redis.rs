use anyhow::{Context, Result};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Session cache backed by a single multiplexed Redis connection.
pub struct RedisCache {
    connection: Arc<Mutex<MultiplexedConnection>>,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .context("Failed to create Redis client")?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        tracing::info!("Connected to Redis at {}", redis_url);

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    pub async fn set_ex(&self, key: &str, value: &str, expiration_secs: u64) -> Result<()> {
        let mut conn = self.connection.lock().await;
        conn.set_ex::<_, _, ()>(key, value, expiration_secs)
            .await
            .context("Failed to set Redis key with expiration")?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.lock().await;
        let val: Option<String> = conn.get(key)
            .await
            .context("Failed to get Redis key")?;
        Ok(val)
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.lock().await;
        conn.del::<_, ()>(key)
            .await
            .context("Failed to delete Redis key")?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.lock().await;
        let exists: bool = conn.exists(key)
            .await
            .context("Failed to check Redis key existence")?;
        Ok(exists)
    }

    /// Remaining time to live in seconds; negative when the key has none or is absent
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        let mut conn = self.connection.lock().await;
        let ttl: i64 = conn.ttl(key)
            .await
            .context("Failed to read Redis key TTL")?;
        Ok(ttl)
    }

    /// Prepend to a list, keep only the newest `max_len` entries and refresh
    /// the expiry, all in one round trip.
    pub async fn push_capped(
        &self,
        key: &str,
        value: &str,
        max_len: usize,
        ttl_secs: u64,
    ) -> Result<()> {
        let stop = max_len.saturating_sub(1) as isize;
        let mut conn = self.connection.lock().await;
        redis::pipe()
            .atomic()
            .lpush(key, value)
            .ignore()
            .ltrim(key, 0, stop)
            .ignore()
            .expire(key, ttl_secs as i64)
            .ignore()
            .query_async::<()>(&mut *conn)
            .await
            .context("Failed to push to capped Redis list")?;
        Ok(())
    }

    pub async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.connection.lock().await;
        let values: Vec<String> = conn.lrange(key, start, stop)
            .await
            .context("Failed to get Redis list range")?;
        Ok(values)
    }

    pub async fn list_len(&self, key: &str) -> Result<usize> {
        let mut conn = self.connection.lock().await;
        let len: usize = conn.llen(key)
            .await
            .context("Failed to get Redis list length")?;
        Ok(len)
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.lock().await;
        let keys: Vec<String> = conn.keys(pattern)
            .await
            .context("Failed to get Redis keys")?;
        Ok(keys)
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.lock().await;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .context("Failed to ping Redis")?;
        Ok(())
    }

    pub async fn is_healthy(&self) -> bool {
        self.ping().await.is_ok()
    }

    pub async fn set_json_ex<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        expiration_secs: u64,
    ) -> Result<()> {
        let json_str = serde_json::to_string(value)
            .context("Failed to serialize value to JSON")?;
        self.set_ex(key, &json_str, expiration_secs).await
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(json_str) => {
                let value = serde_json::from_str(&json_str)
                    .context("Failed to deserialize JSON from Redis")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Return the cached value for `key`, or compute, store and return it
    pub async fn cache_or_compute<F, T, Fut>(
        &self,
        key: &str,
        ttl_secs: u64,
        compute_fn: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        if let Some(cached) = self.get_json::<T>(key).await? {
            tracing::debug!("Cache hit for key: {}", key);
            return Ok(cached);
        }

        tracing::debug!("Cache miss for key: {}, computing...", key);
        let value = compute_fn().await?;
        self.set_json_ex(key, &value, ttl_secs).await?;

        Ok(value)
    }
}
