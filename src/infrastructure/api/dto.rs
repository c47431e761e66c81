use serde::{Deserialize, Serialize};

use crate::domain::entities::SubmissionReceipt;

/// Form endpoint success body.
#[derive(Debug, Deserialize)]
pub struct SubmissionResponse {
    /// Whether the API accepted the submission.
    #[serde(default = "default_success")]
    pub success: bool,
    /// Optional confirmation message.
    #[serde(default)]
    pub message: Option<String>,
    /// Identifier of the stored lead.
    #[serde(default)]
    pub id: Option<String>,
}

const fn default_success() -> bool {
    true
}

impl From<SubmissionResponse> for SubmissionReceipt {
    fn from(response: SubmissionResponse) -> Self {
        Self {
            success: response.success,
            message: response.message,
            id: response.id,
        }
    }
}

/// API error body.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// Human readable message.
    #[serde(alias = "error")]
    pub message: String,
}

/// CAPTCHA verification request.
#[derive(Debug, Serialize)]
pub struct VerifyCaptchaRequest<'a> {
    /// Token obtained from the widget.
    pub token: &'a str,
}

/// CAPTCHA verification response.
#[derive(Debug, Deserialize)]
pub struct VerifyCaptchaResponse {
    /// Whether the token is valid.
    #[serde(alias = "valid")]
    pub success: bool,
}
