//! Cache storage backends.
//!
//! Values are opaque serialized payloads; typing happens in
//! [`ContentCache`](super::ContentCache).

use std::sync::RwLock;

use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Key/value storage behind the cache-aside layer.
///
/// Implementations must be safe to share between concurrent callers.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: String, value: String);

    fn delete(&self, key: &str);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process LRU backend.
///
/// Entries never expire on their own. Capacity eviction only turns a later
/// read into a miss.
pub struct LruBackend {
    entries: RwLock<LruCache<String, String>>,
}

impl LruBackend {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }
}

impl CacheBackend for LruBackend {
    fn get(&self, key: &str) -> Option<String> {
        rw_write(&self.entries, SOURCE, "get").get(key).cloned()
    }

    fn set(&self, key: String, value: String) {
        let evicted = rw_write(&self.entries, SOURCE, "set").push(key.clone(), value);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!("almanac_cache_evict_total").increment(1);
        }
    }

    fn delete(&self, key: &str) {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
    }

    fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn backend(capacity: usize) -> LruBackend {
        LruBackend::new(&CacheConfig {
            capacity,
            ..Default::default()
        })
    }

    #[test]
    fn set_get_delete_roundtrip() {
        let store = backend(8);
        assert!(store.get("topic_keywords").is_none());

        store.set("topic_keywords".to_string(), "[\"menu\"]".to_string());
        assert_eq!(store.get("topic_keywords").as_deref(), Some("[\"menu\"]"));

        store.delete("topic_keywords");
        assert!(store.get("topic_keywords").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn set_overwrites_existing_value() {
        let store = backend(8);
        store.set("theme_data_menu".to_string(), "old".to_string());
        store.set("theme_data_menu".to_string(), "new".to_string());

        assert_eq!(store.get("theme_data_menu").as_deref(), Some("new"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn lru_eviction_drops_least_recent() {
        let store = backend(2);
        store.set("a".to_string(), "1".to_string());
        store.set("b".to_string(), "2".to_string());

        // Touch `a` so `b` becomes the eviction candidate.
        assert!(store.get("a").is_some());
        store.set("c".to_string(), "3".to_string());

        assert!(store.get("a").is_some());
        assert!(store.get("b").is_none());
        assert!(store.get("c").is_some());
    }

    #[test]
    fn clear_drops_everything() {
        let store = backend(8);
        store.set("a".to_string(), "1".to_string());
        store.set("b".to_string(), "2".to_string());
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn backend_recovers_from_poisoned_lock() {
        let store = backend(8);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.set("a".to_string(), "1".to_string());
        assert_eq!(store.get("a").as_deref(), Some("1"));
    }
}
