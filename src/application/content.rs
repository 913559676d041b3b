//! Keyword store service shared by every content kind.
//!
//! Reads go through [`ContentCache`]; writes hit the repository first and
//! drop the affected cache keys only once the write has succeeded.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::application::error::ContentError;
use crate::application::repos::{KeywordRepo, RepoError};
use crate::application::search::{compile_pattern, pattern_matches, substring_matches};
use crate::cache::{CacheKey, ContentCache};
use crate::domain::content::{ContentEntry, ContentKind, NewContent};
use crate::domain::error::require_text;

/// Result of resolving a free-form query to a single entry.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome<K: ContentKind> {
    NoMatch,
    Found(ContentEntry<K>),
    /// More than one keyword contains the query.
    Ambiguous(Vec<String>),
}

/// Trimmed and validated keyword/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub keyword: String,
    pub value: String,
}

#[derive(Clone)]
pub struct ContentService<K: ContentKind> {
    repo: Arc<dyn KeywordRepo<K>>,
    cache: Arc<ContentCache>,
}

impl<K: ContentKind> ContentService<K> {
    pub fn new(repo: Arc<dyn KeywordRepo<K>>, cache: Arc<ContentCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn list_keywords(&self) -> Result<Vec<String>, ContentError> {
        self.cache
            .find_with_cache(&CacheKey::keywords::<K>(), || async {
                self.repo
                    .list_keywords()
                    .await
                    .map_err(|err| self.store_failure("list_keywords", None, err))
            })
            .await
    }

    /// Load one entry. Missing keywords are not cached.
    pub async fn get_by_keyword(&self, keyword: &str) -> Result<ContentEntry<K>, ContentError> {
        let keyword = require_text("keyword", keyword)?;
        self.load(&keyword).await
    }

    /// A blank keyword never exists.
    pub async fn has_keyword(&self, keyword: &str) -> Result<bool, ContentError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(false);
        }
        Ok(self.list_keywords().await?.iter().any(|known| known == keyword))
    }

    /// Validate a create request without writing anything.
    pub async fn check_create(
        &self,
        keyword: &str,
        value: &str,
    ) -> Result<ValidatedInput, ContentError> {
        let input = validate(keyword, value)?;
        if self.list_keywords().await?.contains(&input.keyword) {
            return Err(ContentError::conflict(K::NAME, input.keyword));
        }
        Ok(input)
    }

    /// Validate an update request without writing anything.
    pub async fn check_update(
        &self,
        keyword: &str,
        value: &str,
    ) -> Result<ValidatedInput, ContentError> {
        let input = validate(keyword, value)?;
        if !self.list_keywords().await?.contains(&input.keyword) {
            return Err(ContentError::not_found(K::NAME, input.keyword));
        }
        Ok(input)
    }

    pub async fn create(
        &self,
        keyword: &str,
        value: &str,
        media: K::Media,
    ) -> Result<(), ContentError> {
        let input = self.check_create(keyword, value).await?;
        let keyword = input.keyword.clone();

        match self.repo.insert(new_content(input, media)).await {
            Ok(_) => {}
            Err(RepoError::Duplicate { .. }) => {
                // Another writer won the race; the cached list is stale.
                self.invalidate(&keyword);
                return Err(ContentError::conflict(K::NAME, keyword));
            }
            Err(err) => return Err(self.store_failure("create", Some(&keyword), err)),
        }

        self.invalidate(&keyword);
        info!(kind = K::NAME, keyword = %keyword, "content created");
        Ok(())
    }

    pub async fn update(
        &self,
        keyword: &str,
        value: &str,
        media: K::Media,
    ) -> Result<(), ContentError> {
        let input = self.check_update(keyword, value).await?;
        let keyword = input.keyword.clone();

        let affected = self
            .repo
            .update(&keyword, new_content(input, media))
            .await
            .map_err(|err| self.store_failure("update", Some(&keyword), err))?;

        self.invalidate(&keyword);
        if affected == 0 {
            return Err(ContentError::not_found(K::NAME, keyword));
        }
        info!(kind = K::NAME, keyword = %keyword, "content updated");
        Ok(())
    }

    pub async fn delete(&self, keyword: &str) -> Result<(), ContentError> {
        let keyword = require_text("keyword", keyword)?;
        if !self.list_keywords().await?.contains(&keyword) {
            return Err(ContentError::not_found(K::NAME, keyword));
        }

        let affected = self
            .repo
            .delete(&keyword)
            .await
            .map_err(|err| self.store_failure("delete", Some(&keyword), err))?;

        self.invalidate(&keyword);
        if affected == 0 {
            return Err(ContentError::not_found(K::NAME, keyword));
        }
        info!(kind = K::NAME, keyword = %keyword, "content deleted");
        Ok(())
    }

    /// Keywords containing `query`; an exact match is returned alone.
    pub async fn search_substring(&self, query: &str) -> Result<Vec<String>, ContentError> {
        let query = require_text("query", query)?;
        let keywords = self.list_keywords().await?;
        Ok(substring_matches(&keywords, &query))
    }

    /// Entries whose keyword matches a `%` wildcard pattern.
    ///
    /// Entries that fail to load are logged and left out.
    pub async fn search_pattern(&self, query: &str) -> Result<Vec<ContentEntry<K>>, ContentError> {
        let query = require_text("pattern", query)?;
        let pattern = compile_pattern(&query)?;
        let keywords = self.list_keywords().await?;

        let mut entries = Vec::new();
        for keyword in pattern_matches(&keywords, &pattern) {
            match self.load(&keyword).await {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    warn!(
                        kind = K::NAME,
                        keyword = %keyword,
                        error = %err,
                        "skipping pattern match that failed to load"
                    );
                }
            }
        }
        Ok(entries)
    }

    pub async fn lookup(&self, query: &str) -> Result<LookupOutcome<K>, ContentError> {
        let mut matches = self.search_substring(query).await?;
        match matches.len() {
            0 => Ok(LookupOutcome::NoMatch),
            1 => {
                let keyword = matches.remove(0);
                self.load(&keyword).await.map(LookupOutcome::Found)
            }
            _ => Ok(LookupOutcome::Ambiguous(matches)),
        }
    }

    async fn load(&self, keyword: &str) -> Result<ContentEntry<K>, ContentError> {
        self.cache
            .find_with_cache(&CacheKey::entry::<K>(keyword), || async {
                self.repo
                    .find(keyword)
                    .await
                    .map_err(|err| self.store_failure("find", Some(keyword), err))
                    .and_then(|found| {
                        found.ok_or_else(|| ContentError::not_found(K::NAME, keyword))
                    })
            })
            .await
    }

    fn invalidate(&self, keyword: &str) {
        self.cache.invalidate(&CacheKey::affected_by::<K>(keyword));
    }

    fn store_failure(&self, op: &'static str, keyword: Option<&str>, err: RepoError) -> ContentError {
        error!(
            kind = K::NAME,
            keyword = keyword.unwrap_or_default(),
            op,
            error = %err,
            "content store operation failed"
        );
        ContentError::Store(err)
    }
}

fn validate(keyword: &str, value: &str) -> Result<ValidatedInput, ContentError> {
    Ok(ValidatedInput {
        keyword: require_text("keyword", keyword)?,
        value: require_text("value", value)?,
    })
}

fn new_content<K: ContentKind>(input: ValidatedInput, media: K::Media) -> NewContent<K> {
    NewContent {
        keyword: input.keyword,
        value: input.value,
        media,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::cache::CacheConfig;
    use crate::domain::content::{ImagePaths, NoMedia, Theme, Topic};

    struct StubRepo<K: ContentKind> {
        rows: Mutex<BTreeMap<String, ContentEntry<K>>>,
        finds: AtomicUsize,
        fail_writes: AtomicBool,
    }

    impl<K: ContentKind> StubRepo<K> {
        fn new() -> Self {
            Self {
                rows: Mutex::new(BTreeMap::new()),
                finds: AtomicUsize::new(0),
                fail_writes: AtomicBool::new(false),
            }
        }

        fn write_guard(&self) -> Result<(), RepoError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(RepoError::from_persistence("disk full"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl<K: ContentKind> KeywordRepo<K> for StubRepo<K> {
        async fn insert(&self, content: NewContent<K>) -> Result<ContentEntry<K>, RepoError> {
            self.write_guard()?;
            let mut rows = self.rows.lock().unwrap();
            if rows.contains_key(&content.keyword) {
                return Err(RepoError::Duplicate {
                    constraint: "keyword".to_string(),
                });
            }
            let now = OffsetDateTime::now_utc();
            let entry = ContentEntry {
                id: Uuid::new_v4(),
                keyword: content.keyword.clone(),
                value: content.value,
                media: content.media,
                created_at: now,
                updated_at: now,
            };
            rows.insert(content.keyword, entry.clone());
            Ok(entry)
        }

        async fn update(&self, keyword: &str, content: NewContent<K>) -> Result<u64, RepoError> {
            self.write_guard()?;
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(keyword) {
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
            self.write_guard()?;
            Ok(u64::from(self.rows.lock().unwrap().remove(keyword).is_some()))
        }

        async fn find(&self, keyword: &str) -> Result<Option<ContentEntry<K>>, RepoError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().unwrap().get(keyword).cloned())
        }

        async fn list_keywords(&self) -> Result<Vec<String>, RepoError> {
            Ok(self.rows.lock().unwrap().keys().cloned().collect())
        }
    }

    fn service<K: ContentKind>() -> (ContentService<K>, Arc<StubRepo<K>>) {
        let repo = Arc::new(StubRepo::<K>::new());
        let cache = Arc::new(ContentCache::new(CacheConfig::default()));
        (ContentService::new(repo.clone(), cache), repo)
    }

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let (themes, _) = service::<Theme>();
        themes.create("  menu ", " soup of the day\n", NoMedia).await.unwrap();

        let entry = themes.get_by_keyword("menu").await.unwrap();
        assert_eq!(entry.keyword, "menu");
        assert_eq!(entry.value, "soup of the day");
        assert!(themes.has_keyword("menu").await.unwrap());
        assert!(themes.has_keyword(" menu\t").await.unwrap());
    }

    #[tokio::test]
    async fn blank_keyword_does_not_exist() {
        let (themes, repo) = service::<Theme>();
        themes.create("menu", "v", NoMedia).await.unwrap();

        assert!(!themes.has_keyword("").await.unwrap());
        assert!(!themes.has_keyword("   ").await.unwrap());
        assert!(!themes.has_keyword("men").await.unwrap());
        assert_eq!(repo.finds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let (themes, _) = service::<Theme>();
        themes.create("menu", "v1", NoMedia).await.unwrap();

        let err = themes.create("menu", "v2", NoMedia).await.unwrap_err();
        assert!(matches!(err, ContentError::Conflict { kind: "theme", .. }));
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let (themes, _) = service::<Theme>();
        assert!(matches!(
            themes.create("   ", "value", NoMedia).await,
            Err(ContentError::Validation(_))
        ));
        assert!(matches!(
            themes.create("menu", "", NoMedia).await,
            Err(ContentError::Validation(_))
        ));
        assert!(matches!(
            themes.delete("").await,
            Err(ContentError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn update_replaces_cached_entry() {
        let (topics, _) = service::<Topic>();
        topics
            .create("menu", "v1", ImagePaths::default())
            .await
            .unwrap();
        assert_eq!(topics.get_by_keyword("menu").await.unwrap().value, "v1");

        let images = ImagePaths::new(vec!["images/topics/menu_1_0.png".to_string()]);
        topics.update("menu", "v2", images.clone()).await.unwrap();

        let entry = topics.get_by_keyword("menu").await.unwrap();
        assert_eq!(entry.value, "v2");
        assert_eq!(entry.media, images);
    }

    #[tokio::test]
    async fn update_and_delete_require_existing_keyword() {
        let (themes, _) = service::<Theme>();
        assert!(matches!(
            themes.update("menu", "v", NoMedia).await,
            Err(ContentError::NotFound { .. })
        ));
        assert!(matches!(
            themes.delete("menu").await,
            Err(ContentError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_removes_from_list() {
        let (themes, _) = service::<Theme>();
        themes.create("menu", "v", NoMedia).await.unwrap();
        assert_eq!(themes.list_keywords().await.unwrap(), ["menu"]);

        themes.delete("menu").await.unwrap();
        assert!(themes.list_keywords().await.unwrap().is_empty());
        assert!(matches!(
            themes.get_by_keyword("menu").await,
            Err(ContentError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn store_failure_keeps_cache_intact() {
        let (themes, repo) = service::<Theme>();
        themes.create("menu", "v1", NoMedia).await.unwrap();
        themes.get_by_keyword("menu").await.unwrap();
        let finds = repo.finds.load(Ordering::SeqCst);

        repo.fail_writes.store(true, Ordering::SeqCst);
        let err = themes.update("menu", "v2", NoMedia).await.unwrap_err();
        assert!(matches!(err, ContentError::Store(_)));

        let entry = themes.get_by_keyword("menu").await.unwrap();
        assert_eq!(entry.value, "v1");
        assert_eq!(repo.finds.load(Ordering::SeqCst), finds);
    }

    #[tokio::test]
    async fn repeated_reads_hit_cache() {
        let (themes, repo) = service::<Theme>();
        themes.create("menu", "v", NoMedia).await.unwrap();

        for _ in 0..3 {
            themes.get_by_keyword("menu").await.unwrap();
        }
        assert_eq!(repo.finds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_entries_are_not_cached() {
        let (themes, repo) = service::<Theme>();
        for _ in 0..2 {
            assert!(themes.get_by_keyword("menu").await.is_err());
        }
        assert_eq!(repo.finds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn lookup_reports_each_outcome() {
        let (themes, _) = service::<Theme>();
        themes.create("lunch menu", "noon", NoMedia).await.unwrap();
        themes.create("dinner menu", "evening", NoMedia).await.unwrap();

        assert_eq!(
            themes.lookup("parking").await.unwrap(),
            LookupOutcome::NoMatch
        );
        match themes.lookup("lunch").await.unwrap() {
            LookupOutcome::Found(entry) => assert_eq!(entry.value, "noon"),
            other => panic!("expected a single match, got {other:?}"),
        }
        assert_eq!(
            themes.lookup("menu").await.unwrap(),
            LookupOutcome::Ambiguous(vec!["dinner menu".to_string(), "lunch menu".to_string()])
        );
    }

    #[tokio::test]
    async fn search_pattern_loads_matches() {
        let (themes, _) = service::<Theme>();
        themes.create("xabcy", "1", NoMedia).await.unwrap();
        themes.create("other", "2", NoMedia).await.unwrap();

        let entries = themes.search_pattern("%abc%").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].keyword, "xabcy");

        assert!(matches!(
            themes.search_pattern("(%").await,
            Err(ContentError::Pattern(_))
        ));
    }
}
