//! CAPTCHA token acquisition and optional server-side verification.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::errors::SubmissionError;
use crate::domain::ports::{CaptchaWidgetPort, FormSubmissionPort};

/// Token substituted when no widget is available, so local development can
/// still submit forms. The API accepts it only outside production.
pub const DEVELOPMENT_BYPASS_TOKEN: &str = "development-bypass-token";

/// Obtains CAPTCHA tokens, degrading to the bypass token instead of failing.
#[derive(Clone)]
pub struct CaptchaService {
    widget: Option<Arc<dyn CaptchaWidgetPort>>,
    verifier: Option<Arc<dyn FormSubmissionPort>>,
}

impl std::fmt::Debug for CaptchaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptchaService")
            .field("has_widget", &self.widget.is_some())
            .field("verifies", &self.verifier.is_some())
            .finish()
    }
}

impl CaptchaService {
    /// Creates a service. `None` means the widget is not loaded.
    #[must_use]
    pub fn new(widget: Option<Arc<dyn CaptchaWidgetPort>>) -> Self {
        Self {
            widget,
            verifier: None,
        }
    }

    /// Verifies tokens with the API before they are used.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn FormSubmissionPort>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Returns true if a real widget is configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.widget.is_some()
    }

    /// Produces a token for `action`. Never fails: a missing or broken widget
    /// yields [`DEVELOPMENT_BYPASS_TOKEN`].
    pub async fn token(&self, action: &str) -> String {
        let Some(widget) = &self.widget else {
            warn!(action, "CAPTCHA widget not available, using development token");
            return DEVELOPMENT_BYPASS_TOKEN.to_string();
        };

        match widget.execute(action).await {
            Ok(token) => {
                debug!(action, "CAPTCHA token obtained");
                token
            }
            Err(e) => {
                warn!(action, error = %e, "CAPTCHA widget failed, using development token");
                DEVELOPMENT_BYPASS_TOKEN.to_string()
            }
        }
    }

    /// Asks the API whether `token` is valid. Transport failures count as
    /// not verified.
    pub async fn verify(&self, token: &str) -> bool {
        let Some(verifier) = &self.verifier else {
            return true;
        };
        match verifier.verify_captcha(token).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "CAPTCHA verification request failed");
                false
            }
        }
    }

    /// Obtains a token and, when a verifier is configured, checks it first.
    /// Only an explicit rejection blocks the submission; if the verifier is
    /// unreachable the form endpoint verifies the token itself.
    ///
    /// # Errors
    /// Returns a validation error if the API rejects the token.
    pub async fn token_for_submission(&self, action: &str) -> Result<String, SubmissionError> {
        let token = self.token(action).await;

        if let Some(verifier) = &self.verifier {
            match verifier.verify_captcha(&token).await {
                Ok(true) => {}
                Ok(false) => {
                    return Err(SubmissionError::validation(&[
                        "CAPTCHA verification failed, please try again".to_string(),
                    ]));
                }
                Err(e) => {
                    warn!(error = %e, "Skipping CAPTCHA pre-verification");
                }
            }
        }

        Ok(token)
    }
}
