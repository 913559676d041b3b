//! Almanac cache layer
//!
//! Read-through caching for keyword lookups:
//!
//! - **Keyword lists**: `<kind>_keywords`, the full key set of one kind
//! - **Entries**: `<kind>_data_<keyword>`, a single stored entry
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 1024
//! ```
//!
//! Entries never expire. Mutations drop the affected keys once the store
//! write has succeeded; see [`ContentCache::invalidate`].

mod aside;
mod config;
mod keys;
mod lock;
mod store;

pub use aside::{ContentCache, Epoch};
pub use config::CacheConfig;
pub use keys::CacheKey;
pub use store::{CacheBackend, LruBackend};
