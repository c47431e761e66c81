//! CAPTCHA widget adapter for non-browser callers.

use async_trait::async_trait;
use tracing::trace;

use crate::domain::errors::CaptchaError;
use crate::domain::ports::CaptchaWidgetPort;

/// Widget that hands out a token solved elsewhere, e.g. passed on the
/// command line. The same token is returned for every action.
#[derive(Clone)]
pub struct ProvidedTokenWidget {
    token: String,
}

impl std::fmt::Debug for ProvidedTokenWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvidedTokenWidget")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl ProvidedTokenWidget {
    /// Wraps a pre-solved token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Builds a widget only if a non-blank token was provided.
    #[must_use]
    pub fn from_option(token: Option<String>) -> Option<Self> {
        token
            .filter(|t| !t.trim().is_empty())
            .map(Self::new)
    }
}

#[async_trait]
impl CaptchaWidgetPort for ProvidedTokenWidget {
    async fn execute(&self, action: &str) -> Result<String, CaptchaError> {
        trace!(action, "Using provided CAPTCHA token");
        if self.token.trim().is_empty() {
            return Err(CaptchaError::Unavailable);
        }
        Ok(self.token.clone())
    }
}
