//! Domain layer with core entities, errors and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{OptimizationOptions, QueryKey};
pub use errors::{ImageFetchError, QueryError, SubmissionError};
pub use ports::{CaptchaWidgetPort, FormSubmissionPort, FormatSupportPort, ImageFetchPort};
