//! Lead-capture form payloads and their validation rules.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

/// Matches `something@domain.tld` with no whitespace.
pub const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Returns true if `email` looks like a deliverable address.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX
        .get_or_init(|| Regex::new(EMAIL_PATTERN).expect("Invalid regex"))
        .is_match(email)
}

/// Form endpoints exposed by the site API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    /// General contact form.
    Contact,
    /// Partnership enquiry.
    Partnership,
    /// Newsletter subscription.
    Newsletter,
}

impl FormKind {
    /// Path relative to the API base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Partnership => "partnership",
            Self::Newsletter => "newsletter",
        }
    }

    /// Default request timeout. The contact form carries longer messages.
    #[must_use]
    pub const fn default_timeout(self) -> Duration {
        match self {
            Self::Contact => Duration::from_secs(15),
            Self::Partnership | Self::Newsletter => Duration::from_secs(10),
        }
    }
}

impl std::fmt::Display for FormKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Client-side validation for form payloads.
pub trait Validate {
    /// Returns every problem found, in field order. Empty means valid.
    fn problems(&self) -> Vec<String>;
}

fn require(problems: &mut Vec<String>, value: &str, label: &str) {
    if value.trim().is_empty() {
        problems.push(format!("{label} is required"));
    }
}

fn require_email(problems: &mut Vec<String>, email: &str) {
    if email.trim().is_empty() {
        problems.push("Email is required".to_string());
    } else if !is_valid_email(email.trim()) {
        problems.push("Please enter a valid email address".to_string());
    }
}

/// Sends the address the way it was validated.
fn serialize_trimmed<S>(value: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.trim())
}

fn require_captcha(problems: &mut Vec<String>, token: &str) {
    if token.trim().is_empty() {
        problems.push("Please complete the CAPTCHA verification".to_string());
    }
}

/// Contact form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ContactSubmission {
    pub name: String,
    #[serde(serialize_with = "serialize_trimmed")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Service the visitor is interested in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub message: String,
    pub captcha_token: String,
}

impl Validate for ContactSubmission {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        require(&mut problems, &self.name, "Name");
        require_email(&mut problems, &self.email);
        require(&mut problems, &self.message, "Message");
        require_captcha(&mut problems, &self.captcha_token);
        problems
    }
}

/// Partnership enquiry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PartnershipSubmission {
    pub company_name: String,
    pub contact_name: String,
    #[serde(serialize_with = "serialize_trimmed")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Kind of partnership, e.g. "reseller" or "integration".
    pub partnership_type: String,
    pub message: String,
    pub captcha_token: String,
}

impl Validate for PartnershipSubmission {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        require(&mut problems, &self.company_name, "Company name");
        require(&mut problems, &self.contact_name, "Contact name");
        require_email(&mut problems, &self.email);
        require(&mut problems, &self.partnership_type, "Partnership type");
        require(&mut problems, &self.message, "Message");
        require_captcha(&mut problems, &self.captcha_token);
        problems
    }
}

/// Newsletter signup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct NewsletterSubscription {
    #[serde(serialize_with = "serialize_trimmed")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub captcha_token: String,
}

impl Validate for NewsletterSubscription {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        require_email(&mut problems, &self.email);
        require_captcha(&mut problems, &self.captcha_token);
        problems
    }
}

/// Server acknowledgement of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Server-side reference for the stored lead.
    #[serde(default)]
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn contact() -> ContactSubmission {
        ContactSubmission {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            message: "We need screening for 40 hires".to_string(),
            captcha_token: "token".to_string(),
            ..ContactSubmission::default()
        }
    }

    #[test_case("ada@example.com", true ; "plain")]
    #[test_case("a.b+c@sub.example.co", true ; "subdomain")]
    #[test_case("ada@example", false ; "no tld")]
    #[test_case("ada example@x.com", false ; "whitespace")]
    #[test_case("@example.com", false ; "no local part")]
    #[test_case("", false ; "empty")]
    fn test_email_pattern(email: &str, valid: bool) {
        assert_eq!(is_valid_email(email), valid);
    }

    #[test]
    fn test_valid_contact_has_no_problems() {
        assert!(contact().problems().is_empty());
    }

    #[test]
    fn test_contact_problems_in_field_order() {
        let submission = ContactSubmission {
            email: "not-an-email".to_string(),
            captcha_token: String::new(),
            ..contact()
        };

        assert_eq!(
            submission.problems(),
            vec![
                "Please enter a valid email address".to_string(),
                "Please complete the CAPTCHA verification".to_string(),
            ]
        );
    }

    #[test]
    fn test_partnership_requires_type() {
        let submission = PartnershipSubmission {
            company_name: "Acme".to_string(),
            contact_name: "Ada".to_string(),
            email: "ada@acme.io".to_string(),
            message: "Hello".to_string(),
            captcha_token: "t".to_string(),
            ..PartnershipSubmission::default()
        };

        assert_eq!(submission.problems(), vec!["Partnership type is required"]);
    }

    #[test]
    fn test_contact_serializes_camel_case() {
        let json = serde_json::to_value(contact()).unwrap();
        assert_eq!(json["captchaToken"], "token");
        assert!(json.get("company").is_none());
    }

    #[test]
    fn test_timeouts() {
        assert_eq!(FormKind::Contact.default_timeout(), Duration::from_secs(15));
        assert_eq!(FormKind::Newsletter.default_timeout(), Duration::from_secs(10));
    }
}
