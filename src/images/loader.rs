//! Image loaders, the network side of the image cache.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ImageLoadError;

/// Fetches an image resource, reporting only whether it loaded.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<(), ImageLoadError>;
}

/// Loads images over HTTP, resolving relative paths against an asset base URL.
pub struct HttpImageLoader {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpImageLoader {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Absolute URL for an image locator.
    pub fn resolve(&self, url: &str) -> Result<String, ImageLoadError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ImageLoadError::InvalidUrl(url.to_string()));
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }
        Ok(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        ))
    }
}

#[async_trait]
impl ImageLoader for HttpImageLoader {
    async fn load(&self, url: &str) -> Result<(), ImageLoadError> {
        let absolute = self.resolve(url)?;

        let resp = self
            .client
            .get(&absolute)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ImageLoadError::Request {
                url: absolute.clone(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ImageLoadError::Status {
                url: absolute,
                status: status.as_u16(),
            });
        }

        if let Some(content_type) = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !content_type.starts_with("image/") {
                return Err(ImageLoadError::NotAnImage {
                    url: absolute,
                    content_type: content_type.to_string(),
                });
            }
        }

        // Drain the body so a truncated transfer counts as a failure
        resp.bytes().await.map_err(|e| ImageLoadError::Request {
            url: absolute.clone(),
            reason: e.to_string(),
        })?;

        debug!(url = %absolute, "Image loaded");
        Ok(())
    }
}
