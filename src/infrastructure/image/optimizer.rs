//! Image URL optimization and preloading.
//!
//! Rewrites image sources for the CDNs that accept resize parameters and
//! memoizes the result per `(src, options)` pair. Rewriting never touches the
//! network; only [`ImageOptimizationService::preload`] issues requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use super::cdn::{
    self, CdnError, DEFAULT_PHOTO_CDN_HOSTS, DEFAULT_TRANSFORM_CDN_HOSTS, is_cdn_url,
    is_same_origin_path,
};
use crate::domain::entities::{ImageFormat, OptimizationOptions, PreloadOutcome};
use crate::domain::errors::ImageFetchError;
use crate::domain::ports::{FormatSupportPort, ImageFetchPort};

/// Limit for a single diagnostic load via [`ImageOptimizationService::check_load`].
pub const CHECK_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Hosts recognized by the optimizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerConfig {
    /// Hosts that take query-string resize parameters.
    pub photo_cdn_hosts: Vec<String>,
    /// Hosts that take an `/upload/` transformation segment.
    pub transform_cdn_hosts: Vec<String>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            photo_cdn_hosts: DEFAULT_PHOTO_CDN_HOSTS.iter().map(ToString::to_string).collect(),
            transform_cdn_hosts: DEFAULT_TRANSFORM_CDN_HOSTS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Memoization statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as percentage.
    pub hit_rate: f64,
    /// Current number of entries.
    pub size: usize,
}

/// Rewrites image URLs for known CDNs and warms images ahead of display.
pub struct ImageOptimizationService {
    fetcher: Arc<dyn ImageFetchPort>,
    formats: Arc<dyn FormatSupportPort>,
    config: OptimizerConfig,
    cache: RwLock<HashMap<String, String>>,
    webp_supported: OnceLock<bool>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for ImageOptimizationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageOptimizationService")
            .field("config", &self.config)
            .field("cached", &self.cache_len())
            .field("webp_supported", &self.webp_supported.get())
            .finish_non_exhaustive()
    }
}

impl ImageOptimizationService {
    /// Creates a service recognizing the default CDN hosts.
    #[must_use]
    pub fn new(fetcher: Arc<dyn ImageFetchPort>, formats: Arc<dyn FormatSupportPort>) -> Self {
        Self::with_config(fetcher, formats, OptimizerConfig::default())
    }

    /// Creates a service with custom host lists.
    #[must_use]
    pub fn with_config(
        fetcher: Arc<dyn ImageFetchPort>,
        formats: Arc<dyn FormatSupportPort>,
        config: OptimizerConfig,
    ) -> Self {
        Self {
            fetcher,
            formats,
            config,
            cache: RwLock::new(HashMap::new()),
            webp_supported: OnceLock::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the rendering URL for `src`.
    ///
    /// Same-origin paths and unknown hosts come back unchanged, as does any
    /// source that cannot be rewritten.
    pub fn optimize(&self, src: &str, options: &OptimizationOptions) -> String {
        let key = format!("{src}|{}", options.cache_key());

        if let Some(cached) = self.cache.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(src, "Optimized URL cache hit");
            return cached.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let optimized = self.rewrite(src, options);
        self.cache.write().insert(key, optimized.clone());
        optimized
    }

    fn rewrite(&self, src: &str, options: &OptimizationOptions) -> String {
        if is_same_origin_path(src) {
            return src.to_string();
        }

        let photo_hosts = self.config.photo_cdn_hosts.as_slice();
        let transform_hosts = self.config.transform_cdn_hosts.as_slice();

        let result: Result<String, CdnError> = if is_cdn_url(src, photo_hosts) {
            cdn::apply_photo_params(src, options, self.resolve_format(options.format))
        } else if is_cdn_url(src, transform_hosts) {
            cdn::apply_transformation_segment(src, options, self.resolve_format(options.format))
        } else {
            return src.to_string();
        };

        result.unwrap_or_else(|e| {
            debug!(src, error = %e, "Could not optimize image URL");
            src.to_string()
        })
    }

    fn resolve_format(&self, format: Option<ImageFormat>) -> Option<ImageFormat> {
        match format {
            Some(ImageFormat::Auto) => Some(if self.supports_webp() {
                ImageFormat::Webp
            } else {
                ImageFormat::Jpg
            }),
            other => other,
        }
    }

    /// Whether WebP can be produced locally. Probed once per service.
    pub fn supports_webp(&self) -> bool {
        *self.webp_supported.get_or_init(|| {
            let supported = self.formats.supports(ImageFormat::Webp);
            debug!(supported, "Probed WebP support");
            supported
        })
    }

    /// Builds a `srcset` value with one candidate per width.
    pub fn responsive_src_set(
        &self,
        src: &str,
        widths: &[u32],
        options: &OptimizationOptions,
    ) -> String {
        widths
            .iter()
            .map(|&width| {
                let options = options.clone().with_width(width);
                format!("{} {width}w", self.optimize(src, &options))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Optimizes and requests every URL concurrently. All requests settle
    /// independently; the outcomes are returned in input order.
    pub async fn preload<S: AsRef<str>>(
        &self,
        urls: &[S],
        options: &OptimizationOptions,
    ) -> Vec<PreloadOutcome> {
        let requests = urls.iter().map(|source| {
            let source = source.as_ref().to_string();
            let url = self.optimize(&source, options);
            let fetcher = Arc::clone(&self.fetcher);
            async move {
                let result = fetcher.fetch(&url).await.map(|_| ());
                if let Err(e) = &result {
                    debug!(url = %url, error = %e, "Preload failed");
                }
                PreloadOutcome {
                    source,
                    url,
                    result,
                }
            }
        });

        let outcomes = join_all(requests).await;
        debug!(
            requested = outcomes.len(),
            loaded = outcomes.iter().filter(|o| o.is_loaded()).count(),
            "Preload settled"
        );
        outcomes
    }

    /// Loads one optimized image, giving up after [`CHECK_LOAD_TIMEOUT`].
    /// A timeout settles as a failed outcome.
    pub async fn check_load(&self, src: &str, options: &OptimizationOptions) -> PreloadOutcome {
        let url = self.optimize(src, options);
        let result = match tokio::time::timeout(CHECK_LOAD_TIMEOUT, self.fetcher.fetch(&url)).await
        {
            Ok(fetched) => fetched.map(|image| {
                debug!(url = %url, width = image.width, height = image.height, "Image loaded");
            }),
            Err(_) => Err(ImageFetchError::Timeout {
                timeout_ms: u64::try_from(CHECK_LOAD_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        if let Err(e) = &result {
            warn!(url = %url, error = %e, "Image load check failed");
        }

        PreloadOutcome {
            source: src.to_string(),
            url,
            result,
        }
    }

    /// Number of memoized URLs.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Drops all memoized URLs.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
        debug!("Optimized URL cache cleared");
    }

    /// Returns memoization statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.cache_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::FitMode;
    use crate::domain::ports::mocks::{MockFormatSupport, MockImageFetcher};

    const PHOTO: &str = "https://images.unsplash.com/photo-1";
    const UPLOAD: &str = "https://res.cloudinary.com/demo/image/upload/v1/team.jpg";

    fn service(webp: bool) -> (ImageOptimizationService, Arc<MockImageFetcher>, Arc<MockFormatSupport>) {
        let fetcher = Arc::new(MockImageFetcher::new().failing_on("broken"));
        let formats = Arc::new(MockFormatSupport::new(webp));
        (
            ImageOptimizationService::new(fetcher.clone(), formats.clone()),
            fetcher,
            formats,
        )
    }

    #[test]
    fn test_relative_paths_untouched() {
        let (service, _, _) = service(true);
        let options = OptimizationOptions::new().with_width(400).with_quality(80);

        for src in ["/images/hero.jpg", "./logo.png", "../assets/team.webp"] {
            assert_eq!(service.optimize(src, &options), src);
        }
    }

    #[test]
    fn test_unknown_host_untouched() {
        let (service, _, _) = service(true);
        let src = "https://example.com/pic.png";
        assert_eq!(
            service.optimize(src, &OptimizationOptions::new().with_width(10)),
            src
        );
    }

    #[test]
    fn test_photo_cdn_with_auto_format() {
        let (service, _, _) = service(true);
        let options = OptimizationOptions::new()
            .with_width(400)
            .with_quality(80)
            .with_format(ImageFormat::Auto);

        let url = service.optimize(PHOTO, &options);
        assert!(url.contains("w=400"));
        assert!(url.contains("q=80"));
        assert!(url.contains("fm=webp"));
    }

    #[test]
    fn test_auto_falls_back_to_jpg() {
        let (service, _, _) = service(false);
        let url = service.optimize(
            PHOTO,
            &OptimizationOptions::new().with_format(ImageFormat::Auto),
        );
        assert!(url.ends_with("fm=jpg"));
    }

    #[test]
    fn test_webp_probe_runs_once() {
        let (service, _, formats) = service(true);
        let options = OptimizationOptions::new().with_format(ImageFormat::Auto);

        service.optimize(PHOTO, &options.clone().with_width(1));
        service.optimize(PHOTO, &options.clone().with_width(2));
        service.optimize(UPLOAD, &options);

        assert_eq!(formats.probe_count(), 1);
    }

    #[test]
    fn test_quality_is_clamped() {
        let (service, _, _) = service(true);
        assert!(
            service
                .optimize(PHOTO, &OptimizationOptions::new().with_quality(150))
                .contains("q=100")
        );
        assert!(
            service
                .optimize(PHOTO, &OptimizationOptions::new().with_quality(-5))
                .contains("q=1")
        );
    }

    #[test]
    fn test_transformation_cdn() {
        let (service, _, _) = service(true);
        let options = OptimizationOptions::new()
            .with_width(400)
            .with_height(300)
            .with_quality(80)
            .with_fit(FitMode::Fill)
            .with_format(ImageFormat::Webp);

        assert_eq!(
            service.optimize(UPLOAD, &options),
            "https://res.cloudinary.com/demo/image/upload/w_400,h_300,q_80,c_fill,f_webp/v1/team.jpg"
        );
    }

    #[test]
    fn test_rewrite_failure_returns_source() {
        let (service, _, _) = service(true);
        let src = "https://res.cloudinary.com/demo/raw/team.jpg";
        assert_eq!(
            service.optimize(src, &OptimizationOptions::new().with_width(400)),
            src
        );
    }

    #[test]
    fn test_optimize_is_memoized() {
        let (service, _, _) = service(true);
        let options = OptimizationOptions::new().with_width(400);

        let first = service.optimize(PHOTO, &options);
        let second = service.optimize(PHOTO, &options);

        assert_eq!(first, second);
        assert_eq!(service.cache_len(), 1);
        let stats = service.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        service.clear_cache();
        assert_eq!(service.cache_len(), 0);
        assert_eq!(service.optimize(PHOTO, &options), first);
    }

    #[test]
    fn test_responsive_src_set() {
        let (service, _, _) = service(true);
        let set = service.responsive_src_set(PHOTO, &[320, 640], &OptimizationOptions::new());
        assert_eq!(set, format!("{PHOTO}?w=320 320w, {PHOTO}?w=640 640w"));
    }

    #[tokio::test]
    async fn test_preload_settles_every_url() {
        let (service, fetcher, _) = service(true);
        let urls = [
            "https://images.unsplash.com/photo-a",
            "https://images.unsplash.com/broken",
            "/images/hero.jpg",
        ];

        let outcomes = service
            .preload(&urls, &OptimizationOptions::new().with_width(800))
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(fetcher.request_count(), 3);
        assert_eq!(outcomes.iter().filter(|o| o.is_loaded()).count(), 2);
        assert_eq!(outcomes[1].result, Err(ImageFetchError::http(404)));
        assert_eq!(outcomes[0].url, "https://images.unsplash.com/photo-a?w=800");
        assert_eq!(outcomes[2].url, "/images/hero.jpg");
    }

    #[tokio::test]
    async fn test_preload_empty() {
        let (service, fetcher, _) = service(true);
        let outcomes = service.preload::<&str>(&[], &OptimizationOptions::new()).await;
        assert!(outcomes.is_empty());
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_load_times_out_as_failure() {
        let fetcher = Arc::new(MockImageFetcher::new().with_delay(Duration::from_secs(30)));
        let service =
            ImageOptimizationService::new(fetcher.clone(), Arc::new(MockFormatSupport::new(true)));

        let outcome = service
            .check_load(PHOTO, &OptimizationOptions::new().with_width(200))
            .await;

        assert!(!outcome.is_loaded());
        assert_eq!(outcome.result, Err(ImageFetchError::Timeout { timeout_ms: 5000 }));
        assert_eq!(outcome.url, format!("{PHOTO}?w=200"));
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_load_within_limit() {
        let fetcher = Arc::new(MockImageFetcher::new().with_delay(Duration::from_secs(4)));
        let service =
            ImageOptimizationService::new(fetcher, Arc::new(MockFormatSupport::new(true)));

        let outcome = service.check_load("/images/hero.jpg", &OptimizationOptions::new()).await;
        assert!(outcome.is_loaded());
        assert_eq!(outcome.source, "/images/hero.jpg");
    }
}
