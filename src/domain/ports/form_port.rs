//! Form API port definition.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::{FormKind, SubmissionReceipt};
use crate::domain::errors::SubmissionError;

/// Port for the site's lead-capture API.
#[async_trait]
pub trait FormSubmissionPort: Send + Sync {
    /// Sends an already validated payload to the endpoint for `kind`.
    async fn submit(
        &self,
        kind: FormKind,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<SubmissionReceipt, SubmissionError>;

    /// Returns true only if the API answered its health endpoint with 200.
    async fn health_check(&self, timeout: Duration) -> bool;

    /// Asks the API to verify a CAPTCHA token.
    async fn verify_captcha(&self, token: &str) -> Result<bool, SubmissionError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted form API. Responses are consumed in order; once exhausted
    /// every submission succeeds.
    #[derive(Default)]
    pub struct MockFormPort {
        responses: Mutex<VecDeque<Result<SubmissionReceipt, SubmissionError>>>,
        payloads: Mutex<Vec<(FormKind, serde_json::Value)>>,
        calls: AtomicUsize,
        healthy: bool,
        captcha: Mutex<Option<Result<bool, SubmissionError>>>,
    }

    impl MockFormPort {
        /// Creates a healthy mock that accepts everything.
        pub fn new() -> Self {
            Self {
                healthy: true,
                ..Self::default()
            }
        }

        /// Queues a response for the next submission.
        pub fn respond_with(self, response: Result<SubmissionReceipt, SubmissionError>) -> Self {
            self.responses.lock().push_back(response);
            self
        }

        /// Sets the health endpoint result.
        pub fn with_health(mut self, healthy: bool) -> Self {
            self.healthy = healthy;
            self
        }

        /// Sets the CAPTCHA verification result.
        pub fn with_captcha_result(self, result: Result<bool, SubmissionError>) -> Self {
            *self.captcha.lock() = Some(result);
            self
        }

        /// Number of network calls made.
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Payloads submitted so far.
        pub fn payloads(&self) -> Vec<(FormKind, serde_json::Value)> {
            self.payloads.lock().clone()
        }
    }

    #[async_trait]
    impl FormSubmissionPort for MockFormPort {
        async fn submit(
            &self,
            kind: FormKind,
            payload: serde_json::Value,
            _timeout: Duration,
        ) -> Result<SubmissionReceipt, SubmissionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.payloads.lock().push((kind, payload));
            self.responses.lock().pop_front().unwrap_or_else(|| {
                Ok(SubmissionReceipt {
                    success: true,
                    message: None,
                    id: Some("lead-1".to_string()),
                })
            })
        }

        async fn health_check(&self, _timeout: Duration) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.healthy
        }

        async fn verify_captcha(&self, _token: &str) -> Result<bool, SubmissionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.captcha.lock().clone().unwrap_or(Ok(true))
        }
    }
}
