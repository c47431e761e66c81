//! Verisite - image delivery, query freshness and lead capture for the
//! Verisite marketing site.
//!
//! This crate provides CDN-aware image URL optimization with lazy loading and
//! preloading, a query cache whose background polling yields to in-flight
//! deletes, and validated form submission with retry and CAPTCHA support.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing services.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer containing view components.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "verisite";
