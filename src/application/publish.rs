//! Topic create/update with inline image externalization.

use tracing::warn;

use crate::application::content::ContentService;
use crate::application::error::ContentError;
use crate::application::media::MediaExternalizer;
use crate::domain::content::{ImagePaths, Topic};

/// What the caller gets back after a topic was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedTopic {
    pub keyword: String,
    /// Stored content with image directives rewritten.
    pub content: String,
    /// Local paths of the images saved for this submission.
    pub images: ImagePaths,
}

#[derive(Clone)]
pub struct TopicPublisher {
    topics: ContentService<Topic>,
    media: MediaExternalizer,
}

impl TopicPublisher {
    pub fn new(topics: ContentService<Topic>, media: MediaExternalizer) -> Self {
        Self { topics, media }
    }

    pub fn topics(&self) -> &ContentService<Topic> {
        &self.topics
    }

    pub async fn create(&self, keyword: &str, raw: &str) -> Result<PublishedTopic, ContentError> {
        let input = self.topics.check_create(keyword, raw).await?;
        let externalized = self.media.externalize(&input.keyword, &input.value).await?;

        let written = self
            .topics
            .create(
                &input.keyword,
                &externalized.content,
                externalized.images.clone(),
            )
            .await;
        self.finish(input.keyword, externalized.content, externalized.images, written)
            .await
    }

    pub async fn update(&self, keyword: &str, raw: &str) -> Result<PublishedTopic, ContentError> {
        let input = self.topics.check_update(keyword, raw).await?;
        let externalized = self.media.externalize(&input.keyword, &input.value).await?;

        let written = self
            .topics
            .update(
                &input.keyword,
                &externalized.content,
                externalized.images.clone(),
            )
            .await;
        self.finish(input.keyword, externalized.content, externalized.images, written)
            .await
    }

    async fn finish(
        &self,
        keyword: String,
        content: String,
        images: ImagePaths,
        written: Result<(), ContentError>,
    ) -> Result<PublishedTopic, ContentError> {
        if let Err(err) = written {
            if !images.is_empty() {
                warn!(
                    keyword = %keyword,
                    images = images.len(),
                    "removing images of a topic that could not be stored"
                );
                self.media.discard(&images).await;
            }
            return Err(err);
        }

        Ok(PublishedTopic {
            keyword,
            content,
            images,
        })
    }
}
