//! Infrastructure layer with external service adapters.

/// Form API client.
pub mod api;
/// Application configuration.
pub mod config;
/// Image delivery (CDN rewriting, fetching, preloading).
pub mod image;

pub use api::{HttpFormClient, ProvidedTokenWidget};
pub use config::{AppConfig, CliArgs, Command, ConfigError, Environment, LogLevel, StorageManager};
pub use image::{
    EncoderFormatProbe, HttpImageFetcher, ImageOptimizationService, ImagePreloader,
    OptimizerConfig,
};
