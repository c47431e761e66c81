//! Port definitions for image loading.

use async_trait::async_trait;

use crate::domain::entities::{ImageFormat, LoadedImage};
use crate::domain::errors::ImageFetchError;

/// Port for the platform's image-loading primitive.
/// A successful fetch means the image is decoded and warm in any HTTP cache.
#[async_trait]
pub trait ImageFetchPort: Send + Sync {
    /// Requests and decodes a single image.
    async fn fetch(&self, url: &str) -> Result<LoadedImage, ImageFetchError>;
}

/// Port answering whether the runtime can produce a given encoding.
pub trait FormatSupportPort: Send + Sync {
    /// Returns true if images in `format` can be encoded and decoded locally.
    fn supports(&self, format: ImageFormat) -> bool;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Mock fetcher recording every requested URL.
    #[derive(Default)]
    pub struct MockImageFetcher {
        requests: Mutex<Vec<String>>,
        failing: Vec<String>,
        delay: Option<Duration>,
    }

    impl MockImageFetcher {
        /// Creates a fetcher where every request succeeds.
        pub fn new() -> Self {
            Self::default()
        }

        /// Fails any URL containing `pattern` with HTTP 404.
        pub fn failing_on(mut self, pattern: impl Into<String>) -> Self {
            self.failing.push(pattern.into());
            self
        }

        /// Delays each response.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Number of requests issued so far.
        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }

        /// URLs requested so far, in order.
        pub fn requested(&self) -> Vec<String> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl ImageFetchPort for MockImageFetcher {
        async fn fetch(&self, url: &str) -> Result<LoadedImage, ImageFetchError> {
            self.requests.lock().push(url.to_string());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if self.failing.iter().any(|p| url.contains(p.as_str())) {
                return Err(ImageFetchError::http(404));
            }

            Ok(LoadedImage {
                url: url.to_string(),
                width: 1,
                height: 1,
                byte_len: 0,
            })
        }
    }

    /// Mock format probe with a fixed answer that counts how often it is asked.
    pub struct MockFormatSupport {
        webp: bool,
        probes: AtomicUsize,
    }

    impl MockFormatSupport {
        /// Creates a probe answering `webp` for WebP.
        pub fn new(webp: bool) -> Self {
            Self {
                webp,
                probes: AtomicUsize::new(0),
            }
        }

        /// Number of times the probe ran.
        pub fn probe_count(&self) -> usize {
            self.probes.load(Ordering::SeqCst)
        }
    }

    impl FormatSupportPort for MockFormatSupport {
        fn supports(&self, format: ImageFormat) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            match format {
                ImageFormat::Webp => self.webp,
                ImageFormat::Jpg | ImageFormat::Png | ImageFormat::Auto => true,
            }
        }
    }
}
