use thiserror::Error;

/// CAPTCHA widget failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptchaError {
    /// No widget is loaded in this environment.
    #[error("captcha widget unavailable")]
    Unavailable,

    /// Widget was loaded but could not produce a token.
    #[error("captcha widget failed: {0}")]
    Failed(String),
}
