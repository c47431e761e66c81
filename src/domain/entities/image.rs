//! Domain types for image delivery.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::ImageFetchError;

/// Lowest quality value a CDN accepts.
pub const MIN_QUALITY: i32 = 1;

/// Highest quality value a CDN accepts.
pub const MAX_QUALITY: i32 = 100;

/// Output encoding requested from an image CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// WebP.
    Webp,
    /// JPEG.
    Jpg,
    /// PNG.
    Png,
    /// Pick the most efficient format the runtime can handle.
    #[default]
    Auto,
}

impl ImageFormat {
    /// Returns the CDN parameter value for this format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "webp" => Ok(Self::Webp),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown image format: {other}")),
        }
    }
}

/// How the CDN should fit the image into the requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Crop to the exact box.
    Crop,
    /// Fill the box, cropping overflow.
    Fill,
    /// Scale without preserving aspect ratio.
    Scale,
    /// Shrink to fit, never enlarge.
    Max,
    /// Fit inside the box preserving aspect ratio.
    Clip,
}

impl FitMode {
    /// Parameter value understood by photo CDNs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Fill => "fill",
            Self::Scale => "scale",
            Self::Max => "max",
            Self::Clip => "clip",
        }
    }

    /// Crop-mode code understood by transformation CDNs.
    #[must_use]
    pub const fn transform_code(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Fill => "fill",
            Self::Scale => "scale",
            Self::Max => "limit",
            Self::Clip => "fit",
        }
    }
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crop" => Ok(Self::Crop),
            "fill" => Ok(Self::Fill),
            "scale" => Ok(Self::Scale),
            "max" => Ok(Self::Max),
            "clip" => Ok(Self::Clip),
            other => Err(format!("unknown fit mode: {other}")),
        }
    }
}

/// Rendering parameters for an optimized image URL.
///
/// Field order is fixed so the serialized form can be used as a cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptimizationOptions {
    /// Target width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Target height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Encoder quality, clamped to 1..=100 when written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<i32>,
    /// Output format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    /// Fit mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitMode>,
    /// Blur radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<u32>,
}

impl OptimizationOptions {
    /// Creates empty options.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            width: None,
            height: None,
            quality: None,
            format: None,
            fit: None,
            blur: None,
        }
    }

    /// Sets the target width.
    #[must_use]
    pub const fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Sets the target height.
    #[must_use]
    pub const fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Sets the quality. Out-of-range values are accepted and clamped later.
    #[must_use]
    pub const fn with_quality(mut self, quality: i32) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Sets the output format.
    #[must_use]
    pub const fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Sets the fit mode.
    #[must_use]
    pub const fn with_fit(mut self, fit: FitMode) -> Self {
        self.fit = Some(fit);
        self
    }

    /// Sets the blur radius.
    #[must_use]
    pub const fn with_blur(mut self, blur: u32) -> Self {
        self.blur = Some(blur);
        self
    }

    /// Quality clamped to the range CDNs accept.
    #[must_use]
    pub fn clamped_quality(&self) -> Option<i32> {
        self.quality.map(|q| q.clamp(MIN_QUALITY, MAX_QUALITY))
    }

    /// Deterministic serialized form used in cache keys.
    #[must_use]
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Decoded image returned by a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    /// URL the bytes were fetched from.
    pub url: String,
    /// Decoded width.
    pub width: u32,
    /// Decoded height.
    pub height: u32,
    /// Size of the encoded payload.
    pub byte_len: usize,
}

/// Settlement of a single preload attempt.
#[derive(Debug, Clone)]
pub struct PreloadOutcome {
    /// URL as supplied by the caller.
    pub source: String,
    /// URL actually requested after optimization.
    pub url: String,
    /// Whether the request succeeded.
    pub result: Result<(), ImageFetchError>,
}

impl PreloadOutcome {
    /// Returns true if the image loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summary of a preload batch. Every requested URL is represented exactly once.
#[derive(Debug, Clone, Default)]
pub struct PreloadReport {
    /// Outcomes for URLs that were requested.
    pub outcomes: Vec<PreloadOutcome>,
    /// URLs skipped because they were already loaded.
    pub skipped: Vec<String>,
}

impl PreloadReport {
    /// Number of URLs that settled, requested or skipped.
    #[must_use]
    pub fn settled(&self) -> usize {
        self.outcomes.len() + self.skipped.len()
    }

    /// Number of successful loads in this batch.
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_loaded()).count()
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &PreloadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_loaded())
    }
}
