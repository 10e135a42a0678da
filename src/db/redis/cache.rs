use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Authenticated user row, keyed by email
    User(String),
    /// Revoked access token id
    Blacklist(String),
    /// Request counter for a client within one minute window
    RateLimit(String, i64),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::User(email) => write!(f, "user:{}", email),
            CacheKey::Blacklist(jti) => write!(f, "blacklist:{}", jti),
            CacheKey::RateLimit(client, minute) => write!(f, "rate:{}:{}", client, minute),
        }
    }
}

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Cache handler for storing and retrieving data from Redis
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task and waits for it to flush
    /// all pending writes to Redis.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    ///
    /// Cached user rows are written from this task so that authentication
    /// never waits on a Redis round trip for the write.
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// Background task that fills missing cache entries
    ///
    /// Queued writes never replace an existing entry, so a value read before
    /// an update cannot overwrite the fresher copy written by [`Cache::set`].
    ///
    /// On shutdown signal, flushes all remaining messages before exiting.
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");
        let mut pending_writes = 0;

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    pending_writes += 1;
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    } else {
                        pending_writes -= 1;
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(pending = pending_writes, "Cache writer shutting down, flushing remaining writes");

                    write_rx.close();
                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Writes a single message to Redis unless the key is already set
    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        Self::set_nx(client, &msg.key, &msg.value, msg.ttl).await?;
        Ok(())
    }

    /// `SET key value EX ttl NX`; returns whether the value was written
    async fn set_nx(client: &Client, key: &str, value: &str, ttl: u64) -> AppResult<bool> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.max(1))
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    fn to_json<T: serde::Serialize>(value: &T) -> AppResult<String> {
        serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Cache serialization error: {}", e)))
    }

    /// Stores a value and waits for Redis, replacing whatever was cached
    pub async fn set<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) -> AppResult<()> {
        let json = Self::to_json(value)?;
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key.to_string(), json, ttl.max(1)).await?;
        Ok(())
    }

    /// Stores a value only if the key is absent; returns whether it was written
    pub async fn set_if_absent<T: serde::Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: u64,
    ) -> AppResult<bool> {
        let json = Self::to_json(value)?;
        Self::set_nx(&self.redis_client, &key.to_string(), &json, ttl).await
    }

    /// Retrieves a value from the cache by key
    ///
    /// If the key exists in the cache, the value is deserialized and returned.
    /// If the key does not exist, `None` is returned.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Queues a fill of a missing cache entry without blocking
    ///
    /// The write happens on the background writer with `NX` semantics, so it
    /// is dropped when the key already holds a value.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }

    /// Stores a marker value and waits for Redis to acknowledge it
    ///
    /// Used where later requests must observe the write, such as token revocation.
    pub async fn set_marker(&self, key: &CacheKey, ttl: u64) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key.to_string(), "1", ttl.max(1)).await?;
        Ok(())
    }

    /// Checks whether a key is present
    pub async fn exists(&self, key: &CacheKey) -> AppResult<bool> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let found: bool = conn.exists(key.to_string()).await?;
        Ok(found)
    }

    /// Removes a key so the next read goes to the source of truth
    pub async fn invalidate(&self, key: &CacheKey) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(key.to_string()).await?;
        Ok(())
    }

    /// Increments a counter, setting its expiry when it is first created
    pub async fn increment(&self, key: &CacheKey, ttl: u64) -> AppResult<u64> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let key = key.to_string();
        let count: u64 = conn.incr(&key, 1u64).await?;
        if count == 1 {
            let _: () = conn.expire(&key, ttl as i64).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_user() {
        let key = CacheKey::User("alice@example.com".to_string());
        assert_eq!(key.to_string(), "user:alice@example.com");
    }

    #[test]
    fn test_user_keys_keep_stored_email() {
        let upper = CacheKey::User("Case@Example.com".to_string());
        let lower = CacheKey::User("case@example.com".to_string());
        assert_ne!(upper.to_string(), lower.to_string());
    }

    #[test]
    fn test_cache_key_display_blacklist() {
        let key = CacheKey::Blacklist("3f1c".to_string());
        assert_eq!(key.to_string(), "blacklist:3f1c");
    }

    #[test]
    fn test_cache_key_display_rate_limit() {
        let key = CacheKey::RateLimit("10.0.0.1".to_string(), 29_000_000);
        assert_eq!(key.to_string(), "rate:10.0.0.1:29000000");
    }

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_cache_miss() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let key = CacheKey::User("nobody_12345@example.com".to_string());
        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();

        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_in_background_then_invalidate() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let key = CacheKey::User("cache_roundtrip@example.com".to_string());
        let value = vec!["item1".to_string(), "item2".to_string()];

        cache.set_in_background(&key, &value, 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        cache.invalidate(&key).await.unwrap();
        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_background_fill_never_replaces_fresh_value() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let key = CacheKey::User(format!("{}@example.com", uuid::Uuid::new_v4()));
        cache.set(&key, &"fresh".to_string(), 60).await.unwrap();

        cache.set_in_background(&key, &"stale".to_string(), 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let cached: Option<String> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(cached.as_deref(), Some("fresh"));

        assert!(!cache.set_if_absent(&key, &"stale".to_string(), 60).await.unwrap());
        cache.invalidate(&key).await.unwrap();
        assert!(cache.set_if_absent(&key, &"filled".to_string(), 60).await.unwrap());

        cache.invalidate(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_marker_and_counter() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let marker = CacheKey::Blacklist(uuid::Uuid::new_v4().to_string());
        assert!(!cache.exists(&marker).await.unwrap());
        cache.set_marker(&marker, 60).await.unwrap();
        assert!(cache.exists(&marker).await.unwrap());

        let counter = CacheKey::RateLimit(uuid::Uuid::new_v4().to_string(), 1);
        assert_eq!(cache.increment(&counter, 60).await.unwrap(), 1);
        assert_eq!(cache.increment(&counter, 60).await.unwrap(), 2);

        cache.invalidate(&marker).await.unwrap();
        cache.invalidate(&counter).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_cache_writer_graceful_shutdown() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, handle) = Cache::new(client).await;

        let key = CacheKey::User("shutdown_flush@example.com".to_string());
        let value = vec!["shutdown_test".to_string()];

        cache.set_in_background(&key, &value, 60);
        handle.shutdown().await;
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        cache.invalidate(&key).await.unwrap();
    }
}
