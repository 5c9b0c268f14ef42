pub mod middleware;

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use crate::cache::{CacheStore, CacheStoreExt, keys};
use crate::error::AppError;
use crate::models::credential::{Credential, CredentialFilter, CredentialMeta, CredentialUpdate, NewCredential};
use crate::origin::{Origin, OriginError, OriginStore};

/// Cache tier lives far longer than the response cache — credentials
/// change rarely and the cost of a stale hit (serving one extra request
/// on a just-revoked key) is lower than hammering the origin store on
/// every authenticated call. §4.B specifies this as a multiple of the
/// credential metadata's own refresh cadence.
const CREDENTIAL_CACHE_TTL: Duration = Duration::from_secs(60 * 30);
const META_CACHE_TTL: Duration = Duration::from_secs(60 * 30);

/// Floor on how often an uncached lookup is allowed to reach the origin
/// store for the *same* key, so a burst of requests against one bad key
/// can't turn into a burst of origin queries (§4.B).
const ORIGIN_QUERY_SPACING: Duration = Duration::from_millis(500);

pub struct CredentialService<C, O = OriginStore> {
    cache: C,
    origin: O,
    last_origin_query: Mutex<std::collections::HashMap<String, std::time::Instant>>,
}

impl<C: CacheStore, O: Origin> CredentialService<C, O> {
    pub fn new(cache: C, origin: O) -> Self {
        Self {
            cache,
            origin,
            last_origin_query: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Validates a raw API key. Cache-first; on miss, falls through to the
    /// origin store with per-key spacing (§4.B). A cache transport failure
    /// on the read degrades to a miss rather than failing the request — the
    /// origin store is still authoritative (§7 kind 4).
    pub async fn validate(&self, raw_key: &str) -> Result<bool, AppError> {
        let hash = Credential::hash(raw_key);
        let cache_key = keys::credential_key(&hash);

        let cached = match self.cache.get::<Credential>(&cache_key).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!("credential cache read failed, treating as miss: {e}");
                None
            }
        };

        if let Some(cached) = cached {
            let valid = cached.is_valid_at(Utc::now()) && self.collision_check(&cached, raw_key);
            if !valid {
                // A cache hit that's no longer valid (expired, deactivated,
                // or failed the collision check) is evicted so the next
                // lookup re-checks the origin store instead of repeating
                // the same stale verdict until TTL expiry (§4.B).
                if let Err(e) = self.cache.delete(&cache_key).await {
                    tracing::warn!("credential cache invalidation failed: {e}");
                }
                return Ok(false);
            }
            return Ok(true);
        }

        self.wait_for_spacing(&hash).await;

        let credential = self
            .origin
            .get_credential(&hash)
            .await
            .map_err(origin_to_app_error)?;

        match credential {
            Some(cred) => {
                let valid = cred.is_valid_at(Utc::now()) && self.collision_check(&cred, raw_key);
                // Written back only when valid (§4.B); an invalid or
                // colliding candidate is never cached, so the next request
                // re-checks the origin rather than repeating a negative
                // verdict that may change (e.g. the real key gets added).
                if valid {
                    if let Err(e) = self.cache.set(&cache_key, &cred, CREDENTIAL_CACHE_TTL).await {
                        tracing::warn!("credential cache write-back failed: {e}");
                    }
                }
                Ok(valid)
            }
            None => Ok(false),
        }
    }

    /// Defends against SHA-256 collisions between distinct plaintext keys
    /// mapping to the same document id by comparing plaintext once a
    /// candidate is loaded. Does not need to run in constant time: an
    /// attacker who can already produce a SHA-256 collision has bigger
    /// problems than a timing side-channel (§9).
    fn collision_check(&self, candidate: &Credential, raw_key: &str) -> bool {
        candidate.key == raw_key
    }

    async fn wait_for_spacing(&self, hash: &str) {
        let now = std::time::Instant::now();
        let wait = {
            let mut last = self.last_origin_query.lock().unwrap();
            let wait = last
                .get(hash)
                .and_then(|prev| ORIGIN_QUERY_SPACING.checked_sub(now.duration_since(*prev)));
            last.insert(hash.to_string(), now);
            wait
        };
        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn add(&self, new: NewCredential) -> Result<Credential, AppError> {
        let now = Utc::now();
        let credential = Credential {
            key: new.key.clone(),
            expires_at: new.expires_at,
            source: new.source,
            created_at: now,
            updated_at: now,
            active: true,
        };
        let hash = Credential::hash(&new.key);
        self.origin
            .put_credential(&hash, &credential)
            .await
            .map_err(origin_to_app_error)?;
        self.bump_meta(Some(new.key.clone())).await?;
        self.invalidate(&hash).await?;
        Ok(credential)
    }

    pub async fn update(&self, raw_key: &str, patch: CredentialUpdate) -> Result<Credential, AppError> {
        let hash = Credential::hash(raw_key);
        let mut credential = self
            .origin
            .get_credential(&hash)
            .await
            .map_err(origin_to_app_error)?
            .ok_or_else(|| AppError::malformed("key", "no credential with that key"))?;

        if let Some(expires_at) = patch.expires_at {
            credential.expires_at = expires_at;
        }
        if let Some(source) = patch.source {
            credential.source = source;
        }
        if let Some(active) = patch.active {
            credential.active = active;
        }
        credential.updated_at = Utc::now();

        self.origin
            .put_credential(&hash, &credential)
            .await
            .map_err(origin_to_app_error)?;
        self.invalidate(&hash).await?;
        Ok(credential)
    }

    pub async fn delete(&self, raw_key: &str) -> Result<(), AppError> {
        let hash = Credential::hash(raw_key);
        self.origin
            .delete_credential(&hash)
            .await
            .map_err(origin_to_app_error)?;
        self.bump_meta(None).await?;
        self.invalidate(&hash).await?;
        Ok(())
    }

    pub async fn list(&self, filter: &CredentialFilter) -> Result<Vec<Credential>, AppError> {
        let all = self
            .origin
            .list_credentials()
            .await
            .map_err(origin_to_app_error)?;

        let mut filtered: Vec<Credential> = all
            .into_iter()
            .filter(|c| filter.active.is_none_or(|want| c.active == want))
            .filter(|c| filter.source.as_deref().is_none_or(|want| c.source == want))
            .filter(|c| filter.expires_after.is_none_or(|after| c.expires_at >= after))
            .filter(|c| filter.expires_before.is_none_or(|before| c.expires_at <= before))
            .collect();

        if let Some(limit) = filter.limit {
            filtered.truncate(limit);
        }
        Ok(filtered)
    }

    /// Forces a cache refresh for one key, independent of TTL expiry.
    pub async fn refresh(&self, raw_key: &str) -> Result<(), AppError> {
        let hash = Credential::hash(raw_key);
        self.invalidate(&hash).await
    }

    /// Drops the entire credential cache tier.
    pub async fn clear(&self) -> Result<usize, AppError> {
        let keys = self
            .cache
            .scan_prefix("cred:")
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        let mut count = 0;
        for key in keys {
            if self
                .cache
                .delete(&key)
                .await
                .map_err(|e| AppError::Cache(e.to_string()))?
            {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn invalidate(&self, hash: &str) -> Result<(), AppError> {
        self.cache
            .delete(&keys::credential_key(hash))
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        Ok(())
    }

    async fn bump_meta(&self, last_key_added: Option<String>) -> Result<(), AppError> {
        let all = self
            .origin
            .list_credentials()
            .await
            .map_err(origin_to_app_error)?;
        let meta = CredentialMeta {
            total_count: all.len() as i64,
            active_count: all.iter().filter(|c| c.active).count() as i64,
            last_updated: Some(Utc::now()),
            last_key_added,
        };
        self.origin
            .put_credential_meta(&meta)
            .await
            .map_err(origin_to_app_error)?;
        self.cache
            .set(&keys::credential_meta_key(), &meta, META_CACHE_TTL)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        Ok(())
    }
}

fn origin_to_app_error(e: OriginError) -> AppError {
    AppError::Origin(e.to_string())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::cache::{CacheError, InMemoryCache};
    use crate::origin::fake::FakeOrigin;

    fn credential(key: &str) -> Credential {
        let now = Utc::now();
        Credential {
            key: key.to_string(),
            expires_at: now + chrono::Duration::hours(1),
            source: "admin".into(),
            created_at: now,
            updated_at: now,
            active: true,
        }
    }

    #[test]
    fn collision_check_rejects_mismatched_plaintext() {
        let service = CredentialService::new(InMemoryCache::new(), FakeOrigin::new());
        let cred = credential("real-key");
        assert!(service.collision_check(&cred, "real-key"));
        assert!(!service.collision_check(&cred, "colliding-key"));
    }

    #[tokio::test]
    async fn validate_hits_origin_on_cache_miss_and_caches_result() {
        let hash = Credential::hash("secret-token");
        let origin = FakeOrigin::with_credential(&hash, credential("secret-token"));
        let service = CredentialService::new(InMemoryCache::new(), origin);

        assert!(service.validate("secret-token").await.unwrap());
        // Second lookup is served from the cache tier; a second origin
        // round-trip is not required (and there's no test hook to assert
        // this directly, so we instead assert the cache was actually
        // populated via the credential_key the validate path uses).
        let cached: Option<Credential> = service.cache.get(&keys::credential_key(&hash)).await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn validate_rejects_unknown_key() {
        let service = CredentialService::new(InMemoryCache::new(), FakeOrigin::new());
        assert!(!service.validate("nothing-on-file").await.unwrap());
    }

    #[tokio::test]
    async fn validate_rejects_hash_collision_with_different_plaintext() {
        // Simulates two distinct plaintexts whose hash happens to collide:
        // the credential stored under `hash("attacker-key")` actually
        // belongs to a different key. The collision defense must reject it
        // even though the hash lookup succeeded.
        let hash = Credential::hash("attacker-key");
        let origin = FakeOrigin::with_credential(&hash, credential("real-key"));
        let service = CredentialService::new(InMemoryCache::new(), origin);

        assert!(!service.validate("attacker-key").await.unwrap());
    }

    #[tokio::test]
    async fn validate_deletes_cache_entry_on_invalid_hit() {
        let hash = Credential::hash("expired-token");
        let mut expired = credential("expired-token");
        expired.active = false;
        let cache = InMemoryCache::new();
        cache
            .set(&keys::credential_key(&hash), &expired, CREDENTIAL_CACHE_TTL)
            .await
            .unwrap();
        let service = CredentialService::new(cache, FakeOrigin::new());

        assert!(!service.validate("expired-token").await.unwrap());
        let remaining: Option<Credential> = service.cache.get(&keys::credential_key(&hash)).await.unwrap();
        assert!(remaining.is_none());
    }

    /// A `CacheStore` whose reads always fail, used to prove `validate`
    /// falls through to the origin store on a cache transport error
    /// instead of failing the request (§7 kind 4).
    #[derive(Default)]
    struct FailingCache;

    #[async_trait]
    impl CacheStore for FailingCache {
        async fn get_raw(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Transport("connection refused".into()))
        }
        async fn set_raw(&self, _key: &str, _value: String, _ttl: std::time::Duration) -> Result<(), CacheError> {
            Ok(())
        }
        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Ok(false)
        }
        async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
            Ok(false)
        }
        async fn set_if_absent_raw(
            &self,
            _key: &str,
            _value: String,
            _ttl: std::time::Duration,
        ) -> Result<bool, CacheError> {
            Ok(true)
        }
        async fn increment(&self, _counter: &str) -> Result<i64, CacheError> {
            Err(CacheError::Transport("connection refused".into()))
        }
        async fn scan_prefix(&self, _prefix: &str) -> Result<Vec<String>, CacheError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn validate_falls_through_to_origin_when_cache_read_fails() {
        let hash = Credential::hash("secret-token");
        let origin = FakeOrigin::with_credential(&hash, credential("secret-token"));
        let service = CredentialService::new(FailingCache, origin);

        assert!(service.validate("secret-token").await.unwrap());
    }
}
