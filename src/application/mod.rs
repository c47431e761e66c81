//! Application layer with services coordinating domain ports.

/// Application services.
pub mod services;

pub use services::{
    BackoffPolicy, CaptchaService, DeletionRegistry, FormService, QueryClient, QueryOptions,
    SmartQuery,
};
