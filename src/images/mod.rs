//! Onboarding image loading and caching.

pub mod cache;
pub mod loader;

pub use cache::{ImageCache, ImageStatus};
pub use loader::{HttpImageLoader, ImageLoader};
