use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{BloodRequest, Donor, MatchRecord, NewBloodRequest, NewDonor};
use crate::services::store::{MatchStore, StoreError};

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache. L2 is Redis and optional; without it the
/// manager is a plain TTL cache local to this instance.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a new cache manager, connecting to Redis when a URL is given
    pub async fn new(redis_url: Option<&str>, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let redis = match redis_url {
            Some(url) => {
                let client = redis::Client::open(url)?;
                let manager = redis::aio::ConnectionManager::new(client).await?;
                Some(Arc::new(tokio::sync::Mutex::new(manager)))
            }
            None => None,
        };

        Ok(Self {
            redis,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// In-process cache only
    pub fn l1_only(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
        moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build()
    }

    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);

                // Populate L1 cache
                self.l1_cache
                    .insert(key.to_string(), json.as_bytes().to_vec())
                    .await;

                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in every configured tier
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from every configured tier
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Key for the full donor pool
    pub fn donors() -> String {
        "donors:all".to_string()
    }

    /// Key for a single blood request
    pub fn request(request_id: i64) -> String {
        format!("request:{}", request_id)
    }
}

/// Read-through cache in front of another store
///
/// Only the request lookup and the donor pool scan are cached. Match reads
/// and writes always go to the inner store so insert-if-absent stays exact.
/// A failing cache never fails the call; it is logged and bypassed.
///
/// The donor pool is a snapshot that can be up to one TTL stale. Donor rows
/// changed outside this service (availability, history) show up only after
/// the entry expires. `register_donor` clears the local L1 entry and Redis,
/// but the L1 copies held by other instances still live out their TTL, so
/// keep `cache.ttl_secs` short when several instances share a database.
pub struct CachedStore {
    inner: Arc<dyn MatchStore>,
    cache: Arc<CacheManager>,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn MatchStore>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    async fn fill<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.cache.set(key, value).await {
            tracing::warn!("Failed to cache {}: {}", key, e);
        }
    }
}

#[async_trait]
impl MatchStore for CachedStore {
    fn backend_tag(&self) -> &'static str {
        self.inner.backend_tag()
    }

    async fn get_request(&self, request_id: i64) -> Result<Option<BloodRequest>, StoreError> {
        let key = CacheKey::request(request_id);
        match self.cache.get::<BloodRequest>(&key).await {
            Ok(request) => return Ok(Some(request)),
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
        }

        let request = self.inner.get_request(request_id).await?;
        if let Some(request) = &request {
            self.fill(&key, request).await;
        }
        Ok(request)
    }

    async fn list_donors(&self) -> Result<Vec<Donor>, StoreError> {
        let key = CacheKey::donors();
        match self.cache.get::<Vec<Donor>>(&key).await {
            Ok(donors) => return Ok(donors),
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
        }

        let donors = self.inner.list_donors().await?;
        self.fill(&key, &donors).await;
        Ok(donors)
    }

    async fn match_exists(&self, request_id: i64, donor_id: i64) -> Result<bool, StoreError> {
        self.inner.match_exists(request_id, donor_id).await
    }

    async fn insert_match(&self, request_id: i64, donor_id: i64, score: f64) -> Result<bool, StoreError> {
        self.inner.insert_match(request_id, donor_id, score).await
    }

    async fn list_matches(&self, request_id: i64) -> Result<Vec<MatchRecord>, StoreError> {
        self.inner.list_matches(request_id).await
    }

    async fn create_request(&self, request: NewBloodRequest) -> Result<i64, StoreError> {
        self.inner.create_request(request).await
    }

    async fn register_donor(&self, donor: NewDonor) -> Result<i64, StoreError> {
        let donor_id = self.inner.register_donor(donor).await?;
        if let Err(e) = self.cache.delete(&CacheKey::donors()).await {
            tracing::warn!("Failed to invalidate donor pool cache: {}", e);
        }
        Ok(donor_id)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BloodGroup;
    use crate::services::memory::InMemoryStore;

    #[tokio::test]
    async fn test_l1_set_get_delete() {
        let cache = CacheManager::l1_only(100, 60);
        assert!(!cache.has_redis());

        cache.set("key", &"value").await.unwrap();
        let result: String = cache.get("key").await.unwrap();
        assert_eq!(result, "value");

        cache.delete("key").await.unwrap();
        assert!(matches!(cache.get::<String>("key").await, Err(CacheError::CacheMiss(_))));
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_redis_set_get() {
        let cache = CacheManager::new(Some("redis://127.0.0.1:6379"), 1000, 60)
            .await
            .expect("Failed to create cache");

        cache.set("test_key", &42_i64).await.unwrap();
        assert_eq!(cache.get::<i64>("test_key").await.unwrap(), 42);
        cache.delete("test_key").await.unwrap();
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::donors(), "donors:all");
        assert_eq!(CacheKey::request(42), "request:42");
    }

    #[tokio::test]
    async fn test_register_invalidates_donor_pool() {
        let inner = Arc::new(InMemoryStore::with_data(
            vec![],
            vec![Donor { donor_id: 1, blood_group: "O+".to_string(), ..Default::default() }],
        ));
        let store = CachedStore::new(inner.clone(), Arc::new(CacheManager::l1_only(100, 60)));

        assert_eq!(store.list_donors().await.unwrap().len(), 1);

        store
            .register_donor(NewDonor {
                name: "New".to_string(),
                email: "new@example.com".to_string(),
                phone: "9000000000".to_string(),
                blood_group: BloodGroup::APos,
                city: Some("Guntur".to_string()),
                state: None,
                availability: "yes".to_string(),
                months_since_first_donation: None,
                donation_count: 0,
                pints_donated: 0,
                last_donation_date: None,
            })
            .await
            .unwrap();

        assert_eq!(store.list_donors().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_donor_pool_is_stale_until_ttl_expires() {
        let inner = Arc::new(InMemoryStore::with_data(
            vec![],
            vec![Donor { donor_id: 1, blood_group: "O+".to_string(), ..Default::default() }],
        ));
        let store = CachedStore::new(inner.clone(), Arc::new(CacheManager::l1_only(100, 1)));

        assert_eq!(store.list_donors().await.unwrap().len(), 1);

        // Written behind the cache's back, as another instance would
        inner
            .register_donor(NewDonor {
                name: "Elsewhere".to_string(),
                email: "elsewhere@example.com".to_string(),
                phone: "9000000001".to_string(),
                blood_group: BloodGroup::ONeg,
                city: None,
                state: None,
                availability: "yes".to_string(),
                months_since_first_donation: None,
                donation_count: 0,
                pints_donated: 0,
                last_donation_date: None,
            })
            .await
            .unwrap();

        assert_eq!(store.list_donors().await.unwrap().len(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.list_donors().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cached_request_survives_inner_failure() {
        let inner = Arc::new(InMemoryStore::with_data(
            vec![BloodRequest { request_id: 7, blood_group_needed: "B+".to_string(), ..Default::default() }],
            vec![],
        ));
        let store = CachedStore::new(inner.clone(), Arc::new(CacheManager::l1_only(100, 60)));

        assert!(store.get_request(7).await.unwrap().is_some());

        inner.set_fail_reads(true);
        let cached = store.get_request(7).await.unwrap().unwrap();
        assert_eq!(cached.blood_group_needed, "B+");
        assert!(store.get_request(8).await.is_err());
    }
}
