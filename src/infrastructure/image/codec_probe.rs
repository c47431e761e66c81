//! Local codec capability probe.

use std::io::Cursor;

use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::domain::entities::ImageFormat;
use crate::domain::ports::FormatSupportPort;

/// Answers format support by encoding a 1x1 image and checking the
/// container magic of the output.
#[derive(Debug, Default, Clone, Copy)]
pub struct EncoderFormatProbe;

impl EncoderFormatProbe {
    /// Creates a probe.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn encode(format: image::ImageFormat) -> Option<Vec<u8>> {
        let pixel = DynamicImage::ImageRgb8(RgbImage::new(1, 1));
        let mut buf = Cursor::new(Vec::new());
        match pixel.write_to(&mut buf, format) {
            Ok(()) => Some(buf.into_inner()),
            Err(e) => {
                debug!(?format, error = %e, "Encoder probe failed");
                None
            }
        }
    }
}

/// Returns true if `bytes` start with a RIFF container holding WebP data.
#[must_use]
pub fn is_webp(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}

impl FormatSupportPort for EncoderFormatProbe {
    fn supports(&self, format: ImageFormat) -> bool {
        match format {
            ImageFormat::Webp => {
                Self::encode(image::ImageFormat::WebP).is_some_and(|bytes| is_webp(&bytes))
            }
            ImageFormat::Png => Self::encode(image::ImageFormat::Png).is_some(),
            ImageFormat::Jpg => Self::encode(image::ImageFormat::Jpeg).is_some(),
            ImageFormat::Auto => true,
        }
    }
}
