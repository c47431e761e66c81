//! Domain error types.

mod captcha_error;
mod image_error;
mod query_error;
mod submission_error;

pub use captcha_error::CaptchaError;
pub use image_error::ImageFetchError;
pub use query_error::QueryError;
pub use submission_error::SubmissionError;
