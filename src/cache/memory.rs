use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{CacheError, CacheStore};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process stand-in for Redis, used in unit tests so the query
/// pipeline and credential service can be exercised without a live
/// cache store.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.live(key))
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.live(key).is_some())
    }

    async fn set_if_absent_raw(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        if self.live(key).is_some() {
            return Ok(false);
        }
        self.set_raw(key, value, ttl).await?;
        Ok(true)
    }

    /// Counters share the same keyspace as ordinary values (matching Redis,
    /// where `INCR` operates on the same string key `GET` reads) and never
    /// expire, so `get_raw`/`exists` see them without a separate code path.
    async fn increment(&self, counter: &str) -> Result<i64, CacheError> {
        let mut entries = self.entries.lock().unwrap();
        let current = match entries.get(counter) {
            Some(entry) if entry.expires_at > Instant::now() => entry.value.parse::<i64>().unwrap_or(0),
            _ => 0,
        };
        let next = current + 1;
        entries.insert(
            counter.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: Instant::now() + Duration::from_secs(60 * 60 * 24 * 365),
            },
        );
        Ok(next)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let entries = self.entries.lock().unwrap();
        let now = Instant::now();
        Ok(entries
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.expires_at > now)
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStoreExt;

    #[tokio::test]
    async fn set_if_absent_only_succeeds_once() {
        let cache = InMemoryCache::new();
        assert!(
            cache
                .set_if_absent("k", &"v1", Duration::from_secs(60))
                .await
                .unwrap()
        );
        assert!(
            !cache
                .set_if_absent("k", &"v2", Duration::from_secs(60))
                .await
                .unwrap()
        );
        let value: Option<String> = cache.get("k").await.unwrap();
        assert_eq!(value.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn scan_prefix_respects_prefix_boundary() {
        let cache = InMemoryCache::new();
        cache
            .set_raw("response:jobs:a".into(), "1".into(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set_raw("response:job-list:b".into(), "2".into(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set_raw("cred:c".into(), "3".into(), Duration::from_secs(60))
            .await
            .unwrap();

        let mut keys = cache.scan_prefix("response:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["response:job-list:b", "response:jobs:a"]);
    }

    #[tokio::test]
    async fn clear_cache_is_idempotent() {
        let cache = InMemoryCache::new();
        cache
            .set_raw("response:x".into(), "1".into(), Duration::from_secs(60))
            .await
            .unwrap();

        let keys = cache.scan_prefix("response:").await.unwrap();
        for key in &keys {
            cache.delete(key).await.unwrap();
        }
        assert_eq!(cache.scan_prefix("response:").await.unwrap().len(), 0);

        // Second clear finds nothing left to delete.
        let keys_again = cache.scan_prefix("response:").await.unwrap();
        assert!(keys_again.is_empty());
    }
}
