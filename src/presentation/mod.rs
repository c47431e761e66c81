//! Presentation layer with view components and viewport geometry.

/// Viewport geometry and intersection observation.
pub mod viewport;
/// Reusable widgets.
pub mod widgets;

pub use viewport::{IntersectionEntry, IntersectionObserver, ObserverOptions, Rect};
pub use widgets::{LazyImage, LazyImageProps, LoadState};
