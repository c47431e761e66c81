mod lazy_image;

pub use lazy_image::{LazyImage, LazyImageProps, LoadState};
