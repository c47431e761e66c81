mod captcha_port;
mod form_port;
mod image_fetch_port;

pub use captcha_port::CaptchaWidgetPort;
pub use form_port::FormSubmissionPort;
pub use image_fetch_port::{FormatSupportPort, ImageFetchPort};
