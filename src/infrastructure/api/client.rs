//! Lead-capture API HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header};
use tracing::{debug, warn};

use super::dto::{ErrorResponse, SubmissionResponse, VerifyCaptchaRequest, VerifyCaptchaResponse};
use crate::domain::entities::{FormKind, SubmissionReceipt};
use crate::domain::errors::SubmissionError;
use crate::domain::ports::FormSubmissionPort;

const USER_AGENT: &str = concat!("verisite/", env!("CARGO_PKG_VERSION"));

/// Timeout for CAPTCHA verification requests.
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Form API client.
#[derive(Debug, Clone)]
pub struct HttpFormClient {
    client: Client,
    base_url: String,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn transport_error(e: &reqwest::Error, timeout: Duration) -> SubmissionError {
    if e.is_timeout() {
        SubmissionError::Timeout {
            timeout_ms: millis(timeout),
        }
    } else if e.is_connect() {
        SubmissionError::network("failed to connect to the API")
    } else {
        SubmissionError::network(e.to_string())
    }
}

impl HttpFormClient {
    /// Creates a client for `base_url` (e.g. `http://localhost:3001/api`).
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SubmissionError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SubmissionError::unknown(None, format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn handle_error_response(status: StatusCode, response: Response) -> SubmissionError {
        let retry_after_ms = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000));

        let message = match response.json::<ErrorResponse>().await {
            Ok(error) => error.message,
            Err(_) => format!("HTTP {status}"),
        };

        SubmissionError::from_status(status.as_u16(), message, retry_after_ms)
    }
}

#[async_trait]
impl FormSubmissionPort for HttpFormClient {
    async fn submit(
        &self,
        kind: FormKind,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let url = self.endpoint(kind.path());
        debug!(form = %kind, url = %url, "Submitting form");

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!(form = %kind, error = %e, "Form request failed");
                transport_error(&e, timeout)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(status, response).await);
        }

        let body: SubmissionResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse submission response");
            if e.is_timeout() {
                transport_error(&e, timeout)
            } else {
                SubmissionError::unknown(Some(status.as_u16()), format!("failed to parse response: {e}"))
            }
        })?;

        Ok(body.into())
    }

    async fn health_check(&self, timeout: Duration) -> bool {
        let url = self.endpoint("health");

        match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) => {
                let healthy = response.status() == StatusCode::OK;
                if !healthy {
                    debug!(status = %response.status(), "API health check returned non-200");
                }
                healthy
            }
            Err(e) => {
                debug!(error = %e, "API health check failed");
                false
            }
        }
    }

    async fn verify_captcha(&self, token: &str) -> Result<bool, SubmissionError> {
        let url = self.endpoint("verify-captcha");

        let response = self
            .client
            .post(&url)
            .timeout(VERIFY_TIMEOUT)
            .json(&VerifyCaptchaRequest { token })
            .send()
            .await
            .map_err(|e| transport_error(&e, VERIFY_TIMEOUT))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(Self::handle_error_response(status, response).await);
        }

        let body: VerifyCaptchaResponse = response.json().await.map_err(|e| {
            SubmissionError::unknown(Some(status.as_u16()), format!("failed to parse response: {e}"))
        })?;

        Ok(body.success)
    }
}
