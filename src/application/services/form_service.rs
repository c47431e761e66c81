//! Lead-capture form submission.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::retry::{BackoffPolicy, retry_with_backoff};
use crate::domain::entities::{
    ContactSubmission, FormKind, NewsletterSubscription, PartnershipSubmission, SubmissionReceipt,
    Validate,
};
use crate::domain::errors::SubmissionError;
use crate::domain::ports::FormSubmissionPort;

/// Tag sent with every submission so leads can be attributed.
pub const SUBMISSION_SOURCE: &str = "website";

/// Per-endpoint request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormTimeouts {
    /// Contact form.
    pub contact: Duration,
    /// Partnership and newsletter forms.
    pub default: Duration,
    /// Health endpoint.
    pub health: Duration,
}

impl Default for FormTimeouts {
    fn default() -> Self {
        Self {
            contact: FormKind::Contact.default_timeout(),
            default: FormKind::Newsletter.default_timeout(),
            health: Duration::from_secs(5),
        }
    }
}

impl FormTimeouts {
    /// Timeout for a form endpoint.
    #[must_use]
    pub const fn for_kind(&self, kind: FormKind) -> Duration {
        match kind {
            FormKind::Contact => self.contact,
            FormKind::Partnership | FormKind::Newsletter => self.default,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, T: Serialize> {
    #[serde(flatten)]
    data: &'a T,
    submitted_at: DateTime<Utc>,
    source: &'static str,
}

/// Validates and submits forms, retrying transient failures.
#[derive(Clone)]
pub struct FormService {
    port: Arc<dyn FormSubmissionPort>,
    timeouts: FormTimeouts,
    backoff: BackoffPolicy,
}

impl std::fmt::Debug for FormService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormService")
            .field("timeouts", &self.timeouts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl FormService {
    /// Creates a service with default timeouts and backoff.
    #[must_use]
    pub fn new(port: Arc<dyn FormSubmissionPort>) -> Self {
        Self {
            port,
            timeouts: FormTimeouts::default(),
            backoff: BackoffPolicy::FORMS,
        }
    }

    /// Overrides the timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: FormTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Submits the contact form.
    ///
    /// # Errors
    /// Returns a validation error before any network call if the payload is
    /// invalid, otherwise the mapped API error once retries are exhausted.
    pub async fn submit_contact(
        &self,
        submission: &ContactSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.submit(FormKind::Contact, submission).await
    }

    /// Submits a partnership enquiry.
    ///
    /// # Errors
    /// See [`submit_contact`](Self::submit_contact).
    pub async fn submit_partnership(
        &self,
        submission: &PartnershipSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.submit(FormKind::Partnership, submission).await
    }

    /// Subscribes to the newsletter.
    ///
    /// # Errors
    /// See [`submit_contact`](Self::submit_contact).
    pub async fn subscribe_newsletter(
        &self,
        subscription: &NewsletterSubscription,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.submit(FormKind::Newsletter, subscription).await
    }

    /// Returns true if the API is reachable and healthy.
    pub async fn health_check(&self) -> bool {
        let healthy = self.port.health_check(self.timeouts.health).await;
        debug!(healthy, "API health check");
        healthy
    }

    async fn submit<T>(&self, kind: FormKind, data: &T) -> Result<SubmissionReceipt, SubmissionError>
    where
        T: Validate + Serialize + Sync,
    {
        let problems = data.problems();
        if !problems.is_empty() {
            warn!(form = %kind, count = problems.len(), "Form failed validation");
            return Err(SubmissionError::validation(&problems));
        }

        let payload = serde_json::to_value(Envelope {
            data,
            submitted_at: Utc::now(),
            source: SUBMISSION_SOURCE,
        })
        .map_err(|e| SubmissionError::unknown(None, format!("failed to encode payload: {e}")))?;

        let timeout = self.timeouts.for_kind(kind);
        let port = &self.port;
        let label = format!("submit {kind}");

        let result = retry_with_backoff(&self.backoff, &label, SubmissionError::is_retryable, || {
            let payload = payload.clone();
            async move { port.submit(kind, payload, timeout).await }
        })
        .await;

        match result {
            Ok(receipt) => {
                info!(form = %kind, id = ?receipt.id, "Form submitted");
                Ok(receipt)
            }
            Err((e, attempts)) => {
                warn!(form = %kind, attempts, code = e.code(), error = %e, "Form submission failed");
                Err(e)
            }
        }
    }
}
