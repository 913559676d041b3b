//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::content::{ContentEntry, ContentKind, NewContent};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Keyword-addressed storage for one content kind.
///
/// `update` and `delete` report affected rows; zero means the keyword was
/// not present.
#[async_trait]
pub trait KeywordRepo<K: ContentKind>: Send + Sync {
    async fn insert(&self, content: NewContent<K>) -> Result<ContentEntry<K>, RepoError>;

    async fn update(&self, keyword: &str, content: NewContent<K>) -> Result<u64, RepoError>;

    async fn delete(&self, keyword: &str) -> Result<u64, RepoError>;

    async fn find(&self, keyword: &str) -> Result<Option<ContentEntry<K>>, RepoError>;

    async fn list_keywords(&self) -> Result<Vec<String>, RepoError>;
}
