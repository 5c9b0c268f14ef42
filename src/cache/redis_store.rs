use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{CacheError, CacheStore};

/// Redis-backed cache adapter. Holds a `ConnectionManager`, which is cheap
/// to clone and reconnects automatically — the same shape used for the
/// response-cache layer elsewhere in this lineage, generalized here with
/// the atomic-create and prefix-scan operations §4.A also requires.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect and verify readiness with a PING. Per §4.A / §5, failure to
    /// reach the store fails fast at startup rather than being masked.
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        let mut ping_conn = conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut ping_conn).await?;
        tracing::info!("cache adapter connected");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| CacheError::Transport(e.to_string()))
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(|e| CacheError::Transport(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn
            .del(key)
            .await
            .map_err(|e| CacheError::Transport(e.to_string()))?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        conn.exists(key)
            .await
            .map_err(|e| CacheError::Transport(e.to_string()))
    }

    async fn set_if_absent_raw(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Transport(e.to_string()))?;
        Ok(result.is_some())
    }

    async fn increment(&self, counter: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        conn.incr(counter, 1)
            .await
            .map_err(|e| CacheError::Transport(e.to_string()))
    }

    /// Cursor-driven SCAN rather than KEYS, which would block the server
    /// for the duration of a full keyspace walk (§4.A).
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut found = Vec::new();

        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::Transport(e.to_string()))?;

            found.extend(batch);
            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }

        Ok(found)
    }
}
