//! Keyword-addressed content entries.
//!
//! Themes and topics share one shape. They differ only in whether the kind
//! carries a media column, which is expressed through [`ContentKind::Media`].

use std::fmt::Debug;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::OffsetDateTime;
use uuid::Uuid;

/// Separator used when image paths are stored in a single column.
pub const IMAGE_PATH_SEPARATOR: char = ';';

/// Media slot attached to a content entry.
pub trait MediaColumn:
    Debug + Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Name of the backing column, or `None` for kinds without media.
    const COLUMN: Option<&'static str>;

    fn encode(&self) -> Option<String>;

    fn decode(raw: Option<String>) -> Self;
}

/// Media slot for kinds that never carry images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoMedia;

impl MediaColumn for NoMedia {
    const COLUMN: Option<&'static str> = None;

    fn encode(&self) -> Option<String> {
        None
    }

    fn decode(_raw: Option<String>) -> Self {
        NoMedia
    }
}

/// Locally persisted image paths, in the order they appeared in the content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImagePaths(Vec<String>);

impl ImagePaths {
    pub fn new(paths: Vec<String>) -> Self {
        Self(paths)
    }

    /// Split a stored column value. Empty segments are dropped.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(IMAGE_PATH_SEPARATOR)
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn push(&mut self, path: impl Into<String>) {
        self.0.push(path.into());
    }

    pub fn joined(&self) -> String {
        self.0.join(&IMAGE_PATH_SEPARATOR.to_string())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl MediaColumn for ImagePaths {
    const COLUMN: Option<&'static str> = Some("image");

    fn encode(&self) -> Option<String> {
        Some(self.joined())
    }

    fn decode(raw: Option<String>) -> Self {
        raw.as_deref().map(Self::parse).unwrap_or_default()
    }
}

/// A family of keyword-addressed entries backed by one table.
pub trait ContentKind: Debug + Clone + Copy + Default + PartialEq + Eq + Send + Sync + 'static {
    /// Short name used in cache keys and log fields.
    const NAME: &'static str;
    /// Table holding the entries.
    const TABLE: &'static str;

    type Media: MediaColumn;
}

/// Informational entries without images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Theme;

impl ContentKind for Theme {
    const NAME: &'static str = "theme";
    const TABLE: &'static str = "theme";

    type Media = NoMedia;
}

/// Informational entries that may embed images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Topic;

impl ContentKind for Topic {
    const NAME: &'static str = "topic";
    const TABLE: &'static str = "topic";

    type Media = ImagePaths;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ContentEntry<K: ContentKind> {
    pub id: Uuid,
    pub keyword: String,
    pub value: String,
    pub media: K::Media,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields supplied by callers when writing an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContent<K: ContentKind> {
    pub keyword: String,
    pub value: String,
    pub media: K::Media,
}
