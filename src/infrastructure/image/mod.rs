//! Image delivery infrastructure.
//!
//! This module provides:
//! - CDN URL rewriting
//! - Memoized URL optimization and batch preloading
//! - HTTP image fetching and decoding
//! - Local codec probing

pub mod cdn;
pub mod codec_probe;
pub mod http_fetcher;
pub mod optimizer;
pub mod preloader;

pub use cdn::{CdnError, is_cdn_url, is_same_origin_path};
pub use codec_probe::EncoderFormatProbe;
pub use http_fetcher::HttpImageFetcher;
pub use optimizer::{CHECK_LOAD_TIMEOUT, CacheStats, ImageOptimizationService, OptimizerConfig};
pub use preloader::ImagePreloader;
