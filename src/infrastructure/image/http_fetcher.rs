//! reqwest-backed image fetcher.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace};
use url::Url;

use crate::domain::entities::LoadedImage;
use crate::domain::errors::ImageFetchError;
use crate::domain::ports::ImageFetchPort;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads and decodes images over HTTP.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    site_origin: Option<Url>,
}

impl HttpImageFetcher {
    /// Creates a fetcher. `site_origin` resolves same-origin paths such as
    /// `/images/hero.jpg`; without it those paths cannot be fetched.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(site_origin: Option<Url>, timeout: Duration) -> Result<Self, ImageFetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageFetchError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            site_origin,
        })
    }

    fn resolve(&self, url: &str) -> Result<Url, ImageFetchError> {
        match Url::parse(url) {
            Ok(parsed) => Ok(parsed),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .site_origin
                .as_ref()
                .ok_or_else(|| ImageFetchError::InvalidUrl(format!("{url} (no site origin)")))?
                .join(url)
                .map_err(|e| ImageFetchError::InvalidUrl(format!("{url}: {e}"))),
            Err(e) => Err(ImageFetchError::InvalidUrl(format!("{url}: {e}"))),
        }
    }

    async fn download(&self, url: Url) -> Result<Bytes, ImageFetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageFetchError::Network(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError::http(status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|e| ImageFetchError::Network(format!("Failed to read body: {e}")))
    }
}

#[async_trait]
impl ImageFetchPort for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<LoadedImage, ImageFetchError> {
        let resolved = self.resolve(url)?;
        trace!(url = %resolved, "Fetching image");

        let bytes = self.download(resolved.clone()).await?;
        let byte_len = bytes.len();

        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| ImageFetchError::Decode(format!("Decode task panicked: {e}")))?
            .map_err(|e| ImageFetchError::Decode(format!("Failed to decode image: {e}")))?;

        debug!(
            url = %resolved,
            width = decoded.width(),
            height = decoded.height(),
            byte_len,
            "Image loaded"
        );

        Ok(LoadedImage {
            url: resolved.into(),
            width: decoded.width(),
            height: decoded.height(),
            byte_len,
        })
    }
}
