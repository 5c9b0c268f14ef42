pub mod keys;
mod memory;
mod redis_store;

pub use memory::InMemoryCache;
pub use redis_store::RedisCache;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Typed get/set/delete over a key-value store, used both by the response
/// cache (§4.G) and the credential cache tier (§4.B). Values are
/// serialized as self-describing JSON; callers never see the raw bytes.
///
/// A trait so the query pipeline and credential service can be exercised
/// in tests against `InMemoryCache` without a live Redis, mirroring the
/// single-real-implementation trait seam this codebase draws around
/// collector sources.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
    async fn set_if_absent_raw(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, CacheError>;
    async fn increment(&self, counter: &str) -> Result<i64, CacheError>;
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Convenience layer over `CacheStore` providing the typed get/set the
/// rest of the codebase actually calls.
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get_raw(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CacheError::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::Decode(e.to_string()))?;
        self.set_raw(key, raw, ttl).await
    }

    async fn set_if_absent<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::Decode(e.to_string()))?;
        self.set_if_absent_raw(key, raw, ttl).await
    }
}

impl<T: CacheStore + ?Sized> CacheStoreExt for T {}
