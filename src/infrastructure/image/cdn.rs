//! Image CDN URL rewriting.

use url::Url;

use crate::domain::entities::{ImageFormat, OptimizationOptions};

/// Photo CDNs that accept resize parameters in the query string.
pub const DEFAULT_PHOTO_CDN_HOSTS: &[&str] = &["images.unsplash.com"];

/// CDNs that take transformations as a path segment after `/upload/`.
pub const DEFAULT_TRANSFORM_CDN_HOSTS: &[&str] = &["res.cloudinary.com"];

const UPLOAD_SEGMENT: &str = "/upload/";

/// Errors while rewriting a CDN URL.
#[derive(Debug, thiserror::Error)]
pub enum CdnError {
    /// The source is not an absolute URL.
    #[error("invalid url: {0}")]
    Parse(#[from] url::ParseError),
    /// A transformation CDN URL without an upload segment.
    #[error("no upload segment in {0}")]
    MissingUploadSegment(String),
}

/// Paths that the site's own bundler manages. These are never rewritten.
#[must_use]
pub fn is_same_origin_path(src: &str) -> bool {
    src.starts_with('/') || src.starts_with("./") || src.starts_with("../")
}

/// Checks if a URL is served by one of `hosts`.
#[must_use]
pub fn is_cdn_url<S: AsRef<str>>(url: &str, hosts: &[S]) -> bool {
    hosts.iter().any(|host| url.contains(host.as_ref()))
}

/// Appends resize parameters for a photo CDN, preserving unrelated parameters.
///
/// `format` must already be resolved; [`ImageFormat::Auto`] is ignored.
///
/// # Errors
/// Returns error if `src` is not a valid absolute URL.
pub fn apply_photo_params(
    src: &str,
    options: &OptimizationOptions,
    format: Option<ImageFormat>,
) -> Result<String, CdnError> {
    let mut url = Url::parse(src)?;

    let mut params: Vec<(String, String)> = Vec::new();
    if let Some(width) = options.width {
        params.push(("w".into(), width.to_string()));
    }
    if let Some(height) = options.height {
        params.push(("h".into(), height.to_string()));
    }
    if let Some(quality) = options.clamped_quality() {
        params.push(("q".into(), quality.to_string()));
    }
    if let Some(fit) = options.fit {
        params.push(("fit".into(), fit.as_str().into()));
    }
    if let Some(format) = format.filter(|f| *f != ImageFormat::Auto) {
        params.push(("fm".into(), format.as_str().into()));
    }
    if let Some(blur) = options.blur {
        params.push(("blur".into(), blur.to_string()));
    }

    // Existing parameters stay unless this call sets the same key.
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !params.iter().any(|(ours, _)| ours.as_str() == &**key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    pairs.extend(params);

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    Ok(url.into())
}

/// Inserts a transformation segment after `/upload/`, e.g.
/// `.../image/upload/w_400,q_80,f_webp/v1/team.jpg`.
///
/// # Errors
/// Returns error if `src` is not a valid URL or lacks an upload segment.
pub fn apply_transformation_segment(
    src: &str,
    options: &OptimizationOptions,
    format: Option<ImageFormat>,
) -> Result<String, CdnError> {
    let mut url = Url::parse(src)?;

    let mut transforms = Vec::new();
    if let Some(width) = options.width {
        transforms.push(format!("w_{width}"));
    }
    if let Some(height) = options.height {
        transforms.push(format!("h_{height}"));
    }
    if let Some(quality) = options.clamped_quality() {
        transforms.push(format!("q_{quality}"));
    }
    if let Some(fit) = options.fit {
        transforms.push(format!("c_{}", fit.transform_code()));
    }
    if let Some(format) = format.filter(|f| *f != ImageFormat::Auto) {
        transforms.push(format!("f_{}", format.as_str()));
    }
    if let Some(blur) = options.blur {
        transforms.push(format!("e_blur:{blur}"));
    }

    if transforms.is_empty() {
        return Ok(url.into());
    }

    let path = url.path();
    let idx = path
        .find(UPLOAD_SEGMENT)
        .ok_or_else(|| CdnError::MissingUploadSegment(src.to_string()))?;
    let split = idx + UPLOAD_SEGMENT.len();
    let new_path = format!("{}{}/{}", &path[..split], transforms.join(","), &path[split..]);
    url.set_path(&new_path);

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::FitMode;

    #[test]
    fn test_same_origin_paths() {
        assert!(is_same_origin_path("/images/hero.jpg"));
        assert!(is_same_origin_path("./logo.png"));
        assert!(is_same_origin_path("../assets/team.webp"));
        assert!(!is_same_origin_path("https://images.unsplash.com/photo-1"));
        assert!(!is_same_origin_path("images/hero.jpg"));
    }

    #[test]
    fn test_photo_params() {
        let options = OptimizationOptions::new()
            .with_width(400)
            .with_height(300)
            .with_quality(150)
            .with_fit(FitMode::Crop);
        let url = apply_photo_params(
            "https://images.unsplash.com/photo-1",
            &options,
            Some(ImageFormat::Webp),
        )
        .unwrap();

        assert_eq!(
            url,
            "https://images.unsplash.com/photo-1?w=400&h=300&q=100&fit=crop&fm=webp"
        );
    }

    #[test]
    fn test_photo_params_preserve_existing() {
        let url = apply_photo_params(
            "https://images.unsplash.com/photo-1?ixid=abc&w=2000",
            &OptimizationOptions::new().with_width(400),
            None,
        )
        .unwrap();

        assert!(url.contains("w=400"));
        assert!(url.contains("ixid=abc"));
        assert!(!url.contains("w=2000"));
    }

    #[test]
    fn test_photo_params_keep_values_the_caller_did_not_set() {
        let url = apply_photo_params(
            "https://images.unsplash.com/photo-1?ixlib=rb-4.0.3&auto=format&fit=crop&q=80&w=2070",
            &OptimizationOptions::new().with_width(400),
            None,
        )
        .unwrap();

        assert_eq!(
            url,
            "https://images.unsplash.com/photo-1?ixlib=rb-4.0.3&auto=format&fit=crop&q=80&w=400"
        );
    }

    #[test]
    fn test_photo_params_without_options_keep_url() {
        let url = apply_photo_params(
            "https://images.unsplash.com/photo-1",
            &OptimizationOptions::new(),
            None,
        )
        .unwrap();
        assert_eq!(url, "https://images.unsplash.com/photo-1");
    }

    #[test]
    fn test_transformation_segment() {
        let options = OptimizationOptions::new()
            .with_width(400)
            .with_quality(-5)
            .with_blur(200);
        let url = apply_transformation_segment(
            "https://res.cloudinary.com/demo/image/upload/v1/team.jpg",
            &options,
            Some(ImageFormat::Jpg),
        )
        .unwrap();

        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/w_400,q_1,f_jpg,e_blur:200/v1/team.jpg"
        );
    }

    #[test]
    fn test_transformation_requires_upload_segment() {
        let result = apply_transformation_segment(
            "https://res.cloudinary.com/demo/raw/team.jpg",
            &OptimizationOptions::new().with_width(10),
            None,
        );
        assert!(matches!(result, Err(CdnError::MissingUploadSegment(_))));
    }

    #[test]
    fn test_invalid_url() {
        let result = apply_photo_params("not a url", &OptimizationOptions::new(), None);
        assert!(matches!(result, Err(CdnError::Parse(_))));
    }

    #[test]
    fn test_is_cdn_url() {
        assert!(is_cdn_url(
            "https://images.unsplash.com/photo-1",
            DEFAULT_PHOTO_CDN_HOSTS
        ));
        assert!(!is_cdn_url("https://example.com/a.png", DEFAULT_PHOTO_CDN_HOSTS));
    }
}
