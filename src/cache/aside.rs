//! Read-through cache in front of the keyword store.
//!
//! Entries have no expiry. Every mutation must call
//! [`ContentCache::invalidate`] after it has been persisted.

use std::future::Future;
use std::sync::{Arc, RwLock};

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};
use super::store::{CacheBackend, LruBackend};

const SOURCE: &str = "cache::aside";

/// Monotonic counter bumped by every invalidation.
pub type Epoch = u64;

pub struct ContentCache {
    config: CacheConfig,
    backend: Arc<dyn CacheBackend>,
    // Held for writing while keys are dropped and for reading while a loaded
    // value is stored, so a fill can never land after a newer invalidation.
    epoch: RwLock<Epoch>,
}

impl ContentCache {
    /// Build a cache with the in-process LRU backend.
    pub fn new(config: CacheConfig) -> Self {
        let backend = Arc::new(LruBackend::new(&config));
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            epoch: RwLock::new(0),
        }
    }

    pub fn epoch(&self) -> Epoch {
        *rw_read(&self.epoch, SOURCE, "epoch")
    }

    /// Return the cached value for `key`, or run `loader` and cache its result.
    ///
    /// A failing loader caches nothing and its error is returned unchanged.
    pub async fn find_with_cache<T, E, F, Fut>(&self, key: &CacheKey, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.enabled {
            return loader().await;
        }

        let rendered = key.to_string();
        if let Some(value) = self.lookup(&rendered, key.kind()) {
            return Ok(value);
        }

        counter!("almanac_cache_miss_total", "kind" => key.kind()).increment(1);
        debug!(cache_key = %rendered, "cache miss, loading from store");

        let started_at = self.epoch();
        let value = loader().await?;
        self.fill(rendered, &value, started_at);
        Ok(value)
    }

    /// Drop `keys` and advance the epoch.
    pub fn invalidate(&self, keys: &[CacheKey]) {
        let mut epoch = rw_write(&self.epoch, SOURCE, "invalidate");
        *epoch += 1;
        for key in keys {
            let rendered = key.to_string();
            self.backend.delete(&rendered);
            counter!("almanac_cache_invalidate_total", "kind" => key.kind()).increment(1);
            debug!(cache_key = %rendered, epoch = *epoch, "cache key invalidated");
        }
    }

    fn lookup<T: DeserializeOwned>(&self, key: &str, kind: &'static str) -> Option<T> {
        let raw = self.backend.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => {
                counter!("almanac_cache_hit_total", "kind" => kind).increment(1);
                debug!(cache_key = %key, "cache hit");
                Some(value)
            }
            Err(error) => {
                warn!(cache_key = %key, error = %error, "discarding undecodable cache entry");
                self.backend.delete(key);
                None
            }
        }
    }

    fn fill<T: Serialize>(&self, key: String, value: &T, started_at: Epoch) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(cache_key = %key, error = %error, "value could not be serialized for cache");
                return;
            }
        };

        let epoch = rw_read(&self.epoch, SOURCE, "fill");
        if *epoch != started_at {
            debug!(
                cache_key = %key,
                started_at,
                current = *epoch,
                "skipping cache fill after concurrent invalidation"
            );
            return;
        }
        self.backend.set(key, payload);
    }
}
