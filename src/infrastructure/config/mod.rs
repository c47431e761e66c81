//! Application configuration.

pub mod app_config;
pub mod args;
pub mod storage;

pub use app_config::{
    API_URL_ENV, ApiConfig, AppConfig, Environment, ImageConfig, LogLevel, QueryConfig,
};
pub use args::{CliArgs, Command, ContactArgs, ImageArgs, NewsletterArgs, PartnershipArgs};
pub use storage::{ConfigError, StorageManager};
