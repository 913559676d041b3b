//! Filesystem and HTTP adapters for inline image externalization.

mod fetch;
mod storage;

pub use fetch::HttpImageFetcher;
pub use storage::{MediaStorage, MediaStorageError};
