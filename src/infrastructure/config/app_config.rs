//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::services::{FormTimeouts, QueryOptions};
use crate::infrastructure::image::OptimizerConfig;
use crate::infrastructure::image::cdn::{DEFAULT_PHOTO_CDN_HOSTS, DEFAULT_TRANSFORM_CDN_HOSTS};

const APP_NAME: &str = "verisite";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "verisite";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "VERISITE_API_URL";

/// API base URL used in development.
pub const DEVELOPMENT_API_URL: &str = "http://localhost:3001/api";

/// API base URL used in production.
pub const PRODUCTION_API_URL: &str = "https://api.verisite.com/api";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// Production deployment.
    Production,
}

impl Environment {
    /// Default API base URL for this environment.
    #[must_use]
    pub const fn default_api_url(self) -> &'static str {
        match self {
            Self::Development => DEVELOPMENT_API_URL,
            Self::Production => PRODUCTION_API_URL,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,

    /// Form API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Image delivery settings.
    #[serde(default)]
    pub images: ImageConfig,

    /// Query cache defaults.
    #[serde(default)]
    pub query: QueryConfig,
}

/// Form API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL. Falls back to the environment default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Contact form timeout in seconds.
    #[serde(default = "default_contact_timeout")]
    pub contact_timeout_secs: u64,

    /// Timeout for the other forms in seconds.
    #[serde(default = "default_form_timeout")]
    pub form_timeout_secs: u64,

    /// Health check timeout in seconds.
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,

    /// Verify CAPTCHA tokens with the API before submitting.
    #[serde(default)]
    pub verify_captcha: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            contact_timeout_secs: default_contact_timeout(),
            form_timeout_secs: default_form_timeout(),
            health_timeout_secs: default_health_timeout(),
            verify_captcha: false,
        }
    }
}

impl ApiConfig {
    /// Request timeouts per endpoint.
    #[must_use]
    pub const fn timeouts(&self) -> FormTimeouts {
        FormTimeouts {
            contact: Duration::from_secs(self.contact_timeout_secs),
            default: Duration::from_secs(self.form_timeout_secs),
            health: Duration::from_secs(self.health_timeout_secs),
        }
    }
}

/// Image delivery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Origin used to fetch same-origin paths such as `/images/hero.jpg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_origin: Option<String>,

    /// Hosts that accept query-string resize parameters.
    #[serde(default = "default_photo_hosts")]
    pub photo_cdn_hosts: Vec<String>,

    /// Hosts that accept an upload transformation segment.
    #[serde(default = "default_transform_hosts")]
    pub transform_cdn_hosts: Vec<String>,

    /// Image request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            site_origin: None,
            photo_cdn_hosts: default_photo_hosts(),
            transform_cdn_hosts: default_transform_hosts(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl ImageConfig {
    /// Host lists for the optimizer.
    #[must_use]
    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            photo_cdn_hosts: self.photo_cdn_hosts.clone(),
            transform_cdn_hosts: self.transform_cdn_hosts.clone(),
        }
    }

    /// Image request timeout.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Query cache defaults.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Seconds fetched data stays fresh.
    #[serde(default = "default_stale_time")]
    pub stale_time_secs: u64,

    /// Seconds unused data stays cached.
    #[serde(default = "default_gc_time")]
    pub gc_time_secs: u64,

    /// Retries after a failed fetch.
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// Refetch when the window regains focus.
    #[serde(default)]
    pub refetch_on_window_focus: bool,

    /// Refetch when connectivity returns.
    #[serde(default = "default_true")]
    pub refetch_on_reconnect: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: default_stale_time(),
            gc_time_secs: default_gc_time(),
            retry: default_retry(),
            refetch_on_window_focus: false,
            refetch_on_reconnect: true,
        }
    }
}

impl QueryConfig {
    /// Default options for the query client.
    #[must_use]
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            refetch_on_window_focus: self.refetch_on_window_focus,
            refetch_on_reconnect: self.refetch_on_reconnect,
            stale_time: Duration::from_secs(self.stale_time_secs),
            gc_time: Duration::from_secs(self.gc_time_secs),
            retry: self.retry,
            ..QueryOptions::default()
        }
    }
}

const fn default_contact_timeout() -> u64 {
    15
}

const fn default_form_timeout() -> u64 {
    10
}

const fn default_health_timeout() -> u64 {
    5
}

const fn default_fetch_timeout() -> u64 {
    30
}

const fn default_stale_time() -> u64 {
    5 * 60
}

const fn default_gc_time() -> u64 {
    10 * 60
}

const fn default_retry() -> u32 {
    3
}

const fn default_true() -> bool {
    true
}

fn default_photo_hosts() -> Vec<String> {
    DEFAULT_PHOTO_CDN_HOSTS.iter().map(ToString::to_string).collect()
}

fn default_transform_hosts() -> Vec<String> {
    DEFAULT_TRANSFORM_CDN_HOSTS
        .iter()
        .map(ToString::to_string)
        .collect()
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(environment) = args.environment {
            self.environment = environment;
        }
        if let Some(api_url) = &args.api_url {
            self.api.base_url = Some(api_url.clone());
        }
        if let Some(site_origin) = &args.site_origin {
            self.images.site_origin = Some(site_origin.clone());
        }
    }

    /// Resolves the API base URL: `env_override`, then the configured URL,
    /// then the environment default.
    #[must_use]
    pub fn resolve_base_url(&self, env_override: Option<&str>) -> String {
        env_override
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.api
                    .base_url
                    .as_deref()
                    .filter(|url| !url.trim().is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| self.environment.default_api_url().to_string())
    }

    /// Resolves the API base URL from [`API_URL_ENV`].
    #[must_use]
    pub fn api_base_url(&self) -> String {
        let from_env = std::env::var(API_URL_ENV).ok();
        self.resolve_base_url(from_env.as_deref())
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("verisite.log"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            environment = "production"
            log_level = "debug"

            [api]
            contact_timeout_secs = 20
            verify_captcha = true

            [images]
            site_origin = "https://verisite.com"

            [query]
            retry = 1
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.api.contact_timeout_secs, 20);
        assert_eq!(config.api.form_timeout_secs, 10);
        assert!(config.api.verify_captcha);
        assert_eq!(config.images.site_origin.as_deref(), Some("https://verisite.com"));
        assert_eq!(config.images.photo_cdn_hosts, vec!["images.unsplash.com"]);
        assert_eq!(config.query.retry, 1);
        assert!(config.query.refetch_on_reconnect);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.api.timeouts(), FormTimeouts::default());
        assert_eq!(config.query.query_options(), QueryOptions::default());
        assert_eq!(config.images.optimizer_config(), OptimizerConfig::default());
    }

    #[test]
    fn test_base_url_precedence() {
        let mut config = AppConfig::default();
        assert_eq!(config.resolve_base_url(None), DEVELOPMENT_API_URL);

        config.environment = Environment::Production;
        assert_eq!(config.resolve_base_url(None), PRODUCTION_API_URL);

        config.api.base_url = Some("https://staging.verisite.com/api".to_string());
        assert_eq!(
            config.resolve_base_url(None),
            "https://staging.verisite.com/api"
        );

        assert_eq!(
            config.resolve_base_url(Some("http://10.0.0.2/api")),
            "http://10.0.0.2/api"
        );
        assert_eq!(
            config.resolve_base_url(Some("  ")),
            "https://staging.verisite.com/api"
        );
    }

    #[test]
    fn test_blank_configured_base_url_falls_back() {
        let mut config = AppConfig::default();
        config.environment = Environment::Production;
        config.api.base_url = Some("   ".to_string());

        assert_eq!(config.resolve_base_url(None), PRODUCTION_API_URL);
        assert_eq!(config.resolve_base_url(Some("")), PRODUCTION_API_URL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_section_drives_client_retries() {
        let mut config = AppConfig::default();
        config.query.retry = 1;
        let client = crate::application::services::QueryClient::new(config.query.query_options());

        let mut calls = 0;
        let result: Result<(), _> = client
            .fetch_query(&crate::query_key!["health"], || {
                calls += 1;
                async { Err::<(), _>("unhealthy") }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 2);
    }
}
