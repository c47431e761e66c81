//! CAPTCHA widget port definition.

use async_trait::async_trait;

use crate::domain::errors::CaptchaError;

/// Port for the third-party CAPTCHA widget.
#[async_trait]
pub trait CaptchaWidgetPort: Send + Sync {
    /// Produces a token for `action` (e.g. `"contact_form"`).
    async fn execute(&self, action: &str) -> Result<String, CaptchaError>;
}
