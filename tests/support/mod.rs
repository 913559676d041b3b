#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use almanac::application::media::{ImageFetcher, MediaError};
use almanac::application::repos::{KeywordRepo, RepoError};
use almanac::domain::content::{ContentEntry, ContentKind, NewContent};
use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

/// In-memory keyword store that keeps insertion order.
pub struct MemoryRepo<K: ContentKind> {
    rows: Mutex<Vec<ContentEntry<K>>>,
    pub finds: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_writes: AtomicBool,
}

impl<K: ContentKind> Default for MemoryRepo<K> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            finds: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }
}

impl<K: ContentKind> MemoryRepo<K> {
    pub fn stored(&self, keyword: &str) -> Option<ContentEntry<K>> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|entry| entry.keyword == keyword)
            .cloned()
    }

    fn begin_write(&self) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl<K: ContentKind> KeywordRepo<K> for MemoryRepo<K> {
    async fn insert(&self, content: NewContent<K>) -> Result<ContentEntry<K>, RepoError> {
        self.begin_write()?;
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|entry| entry.keyword == content.keyword) {
            return Err(RepoError::Duplicate {
                constraint: format!("{}_keyword_key", K::TABLE),
            });
        }
        let now = OffsetDateTime::now_utc();
        let entry = ContentEntry {
            id: Uuid::new_v4(),
            keyword: content.keyword,
            value: content.value,
            media: content.media,
            created_at: now,
            updated_at: now,
        };
        rows.push(entry.clone());
        Ok(entry)
    }

    async fn update(&self, keyword: &str, content: NewContent<K>) -> Result<u64, RepoError> {
        self.begin_write()?;
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|entry| entry.keyword == keyword) {
            Some(entry) => {
                entry.value = content.value;
                entry.media = content.media;
                entry.updated_at = OffsetDateTime::now_utc();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, keyword: &str) -> Result<u64, RepoError> {
        self.begin_write()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|entry| entry.keyword != keyword);
        Ok((before - rows.len()) as u64)
    }

    async fn find(&self, keyword: &str) -> Result<Option<ContentEntry<K>>, RepoError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        Ok(self.stored(keyword))
    }

    async fn list_keywords(&self) -> Result<Vec<String>, RepoError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|entry| entry.keyword.clone())
            .collect())
    }
}

/// Serves canned payloads by URL and counts requests.
#[derive(Default)]
pub struct StubFetcher {
    payloads: HashMap<String, Vec<u8>>,
    pub requests: AtomicUsize,
}

impl StubFetcher {
    pub fn with(mut self, url: &str, payload: &[u8]) -> Self {
        self.payloads.insert(url.to_string(), payload.to_vec());
        self
    }
}

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, MediaError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.payloads
            .get(url)
            .map(|payload| Bytes::from(payload.clone()))
            .ok_or_else(|| MediaError::download(url, "server returned 404 Not Found"))
    }
}
