//! Cache key definitions.
//!
//! Keys render to the logical strings `<kind>_keywords` and
//! `<kind>_data_<keyword>`, which is what the backend stores.

use std::fmt;

use crate::domain::content::ContentKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full keyword list of one kind.
    Keywords { kind: &'static str },
    /// A single entry of one kind.
    Entry { kind: &'static str, keyword: String },
}

impl CacheKey {
    pub fn keywords<K: ContentKind>() -> Self {
        Self::Keywords { kind: K::NAME }
    }

    pub fn entry<K: ContentKind>(keyword: &str) -> Self {
        Self::Entry {
            kind: K::NAME,
            keyword: keyword.to_string(),
        }
    }

    /// Keys a successful mutation of `keyword` must drop.
    pub fn affected_by<K: ContentKind>(keyword: &str) -> [Self; 2] {
        [Self::keywords::<K>(), Self::entry::<K>(keyword)]
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Keywords { kind } | Self::Entry { kind, .. } => kind,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keywords { kind } => write!(f, "{kind}_keywords"),
            Self::Entry { kind, keyword } => write!(f, "{kind}_data_{keyword}"),
        }
    }
}
