//! Domain entity definitions.

mod forms;
mod image;
mod query;

pub use forms::{
    ContactSubmission, EMAIL_PATTERN, FormKind, NewsletterSubscription, PartnershipSubmission,
    SubmissionReceipt, Validate, is_valid_email,
};
pub use image::{
    FitMode, ImageFormat, LoadedImage, MAX_QUALITY, MIN_QUALITY, OptimizationOptions,
    PreloadOutcome, PreloadReport,
};
pub use query::{KeyPart, QueryKey};
