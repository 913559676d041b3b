//! Externalization of inline images embedded in submitted content.
//!
//! Every `[CQ:image,...,url=...]` directive is downloaded once, saved under
//! the media directory and rewritten to point at the public URL of the
//! saved file.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::domain::content::ImagePaths;
use crate::domain::directives::{find_image_directives, splice};
use crate::infra::media::{MediaStorage, MediaStorageError};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to download image from {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("failed to save image {file_name}")]
    Persist {
        file_name: String,
        #[source]
        source: MediaStorageError,
    },
    #[error("cannot derive public URL for {file_name}")]
    InvalidUrl {
        file_name: String,
        #[source]
        source: url::ParseError,
    },
}

impl MediaError {
    pub fn download(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Outbound HTTP GET for image payloads.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, MediaError>;
}

/// Content with every downloadable image rewritten to a local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalizedContent {
    pub content: String,
    /// Saved paths in directive order.
    pub images: ImagePaths,
}

#[derive(Clone)]
pub struct MediaExternalizer {
    fetcher: Arc<dyn ImageFetcher>,
    storage: Arc<MediaStorage>,
}

impl MediaExternalizer {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, storage: Arc<MediaStorage>) -> Self {
        Self { fetcher, storage }
    }

    /// Download, save and rewrite every image directive in `content`.
    ///
    /// On failure the files saved so far are removed before the error is
    /// returned.
    pub async fn externalize(
        &self,
        keyword: &str,
        content: &str,
    ) -> Result<ExternalizedContent, MediaError> {
        let directives = find_image_directives(content);
        if directives.is_empty() {
            return Ok(ExternalizedContent {
                content: content.to_string(),
                images: ImagePaths::default(),
            });
        }

        let stamp = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let prefix = sanitize_keyword(keyword);
        let mut saved: Vec<PathBuf> = Vec::new();
        let mut replacements = Vec::new();

        for directive in &directives {
            let Some(url) = directive.url() else {
                continue;
            };
            let file_name = format!("{prefix}_{stamp}_{}.png", directive.index);

            match self.save_one(&url, &file_name).await {
                Ok((path, public_url)) => {
                    saved.push(path);
                    replacements.push((directive.span.clone(), directive.rewrite(&public_url)));
                }
                Err(err) => {
                    self.remove_paths(&saved).await;
                    return Err(err);
                }
            }
        }

        let images = ImagePaths::new(
            saved
                .iter()
                .map(|path| path.to_string_lossy().into_owned())
                .collect(),
        );
        debug!(keyword, images = images.len(), "externalized inline images");

        Ok(ExternalizedContent {
            content: splice(content, &replacements),
            images,
        })
    }

    /// Best-effort removal of previously saved images.
    pub async fn discard(&self, images: &ImagePaths) {
        let paths: Vec<PathBuf> = images.iter().map(PathBuf::from).collect();
        self.remove_paths(&paths).await;
    }

    async fn save_one(&self, url: &str, file_name: &str) -> Result<(PathBuf, String), MediaError> {
        let public_url =
            self.storage
                .public_url(file_name)
                .map_err(|source| MediaError::InvalidUrl {
                    file_name: file_name.to_string(),
                    source,
                })?;
        let bytes = self.fetcher.fetch(url).await?;
        let path = self
            .storage
            .persist(file_name, &bytes)
            .await
            .map_err(|source| MediaError::Persist {
                file_name: file_name.to_string(),
                source,
            })?;
        Ok((path, public_url.to_string()))
    }

    async fn remove_paths(&self, paths: &[PathBuf]) {
        for path in paths {
            if let Err(err) = self.storage.remove(path).await {
                warn!(path = %path.display(), error = %err, "failed to remove saved image");
            }
        }
    }
}

/// Make `keyword` safe to use as a file-name prefix.
///
/// The result must also survive inside a rewritten directive's `file=`
/// parameter and the `;`-joined image column.
pub fn sanitize_keyword(keyword: &str) -> String {
    let mut sanitized: String = keyword
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | '?' | '#' | '%' | ':' | ',' | '[' | ']' | '&' | '=' | ';' => '_',
            ch if ch.is_whitespace() || ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    if sanitized.starts_with('.') {
        sanitized.replace_range(..1, "_");
    }
    if sanitized.is_empty() {
        sanitized.push('_');
    }
    sanitized
}
