//! Error types for the onboarding tour.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Image load error: {0}")]
    ImageLoad(#[from] ImageLoadError),

    #[error("Healthcheck error: {0}")]
    Healthcheck(#[from] HealthcheckError),

    #[error("Tour error: {0}")]
    Tour(#[from] TourError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Client-side key/value storage errors.
///
/// None of these reach the host: the progress store logs them and falls back
/// to "no persistence".
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded writing {key} ({needed} bytes, {quota} allowed)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Image fetch failures. Recorded by the image cache as `error: true`.
#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("Invalid image URL: {0:?}")]
    InvalidUrl(String),

    #[error("Request for {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Image {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Resource {url} is not an image (content-type {content_type})")]
    NotAnImage { url: String, content_type: String },
}

/// Deployment-identity healthcheck errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthcheckError {
    #[error("Healthcheck request failed: {0}")]
    Request(String),

    #[error("Healthcheck returned HTTP {0}")]
    Status(u16),

    #[error("Failed to decode healthcheck response: {0}")]
    Decode(String),
}

/// Programmer errors in driving the tour.
#[derive(Debug, thiserror::Error)]
pub enum TourError {
    #[error("No onboarding steps for route {route}")]
    EmptyStepList { route: String },

    #[error("Step index {index} out of range for {len} steps")]
    StepOutOfRange { index: usize, len: usize },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
