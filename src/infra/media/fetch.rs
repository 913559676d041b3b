use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::application::media::{ImageFetcher, MediaError};
use crate::config::MediaSettings;
use crate::infra::error::InfraError;

/// Downloads images with a bounded timeout and a browser-like user agent.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_settings(settings: &MediaSettings) -> Result<Self, InfraError> {
        Self::new(settings.download_timeout, &settings.user_agent)
    }

    async fn download(&self, url: &str) -> Result<Bytes, MediaError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| MediaError::download(url, err))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(MediaError::download(url, format!("server returned {status}")));
        }

        response
            .bytes()
            .await
            .map_err(|err| MediaError::download(url, err))
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, MediaError> {
        match self.download(url).await {
            Ok(bytes) => {
                counter!("almanac_media_download_total").increment(1);
                debug!(url, bytes = bytes.len(), "downloaded image");
                Ok(bytes)
            }
            Err(err) => {
                counter!("almanac_media_download_failed_total").increment(1);
                warn!(url, error = %err, "image download failed");
                Err(err)
            }
        }
    }
}
