//! Image cache with deduplicated, memoized load outcomes keyed by URL.
//!
//! The first `ensure_loaded` for a URL starts exactly one fetch; every
//! concurrent or later caller shares its outcome. Outcomes are terminal:
//! a failed image is never retried and no entry is ever evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use serde::Serialize;
use tracing::{debug, warn};

use super::loader::ImageLoader;

/// Settled load outcome for one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageStatus {
    pub loaded: bool,
    pub error: bool,
}

impl ImageStatus {
    pub const LOADED: Self = Self {
        loaded: true,
        error: false,
    };
    pub const FAILED: Self = Self {
        loaded: true,
        error: true,
    };
}

type LoadFuture = Shared<BoxFuture<'static, ImageStatus>>;

enum Slot {
    Pending(LoadFuture),
    Settled(ImageStatus),
}

/// Shared image cache, scoped to one application instance.
pub struct ImageCache {
    loader: Arc<dyn ImageLoader>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl ImageCache {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Arc<Self> {
        Arc::new(Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        })
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settled outcome for `url`, or `None` while unknown or in flight.
    pub fn status(&self, url: &str) -> Option<ImageStatus> {
        match self.slots().get(url) {
            Some(Slot::Settled(status)) => Some(*status),
            _ => None,
        }
    }

    /// Resolve once the outcome for `url` is known. Never fails: a load
    /// error is reported as `error: true`.
    pub async fn ensure_loaded(&self, url: &str) -> ImageStatus {
        let pending = {
            let mut slots = self.slots();
            match slots.get(url) {
                Some(Slot::Settled(status)) => return *status,
                Some(Slot::Pending(fut)) => fut.clone(),
                None => {
                    let fut = self.start_load(url);
                    slots.insert(url.to_string(), Slot::Pending(fut.clone()));
                    fut
                }
            }
        };

        let status = pending.await;

        let mut slots = self.slots();
        if matches!(slots.get(url), Some(Slot::Pending(_))) {
            slots.insert(url.to_string(), Slot::Settled(status));
        }
        status
    }

    /// Warm the cache for every URL concurrently.
    pub async fn preload_all<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls: Vec<String> = urls.into_iter().map(|u| u.as_ref().to_string()).collect();
        join_all(urls.iter().map(|url| self.ensure_loaded(url))).await;
    }

    /// Number of URLs the cache knows about (settled or in flight).
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    fn start_load(&self, url: &str) -> LoadFuture {
        let loader = Arc::clone(&self.loader);
        let url = url.to_string();
        async move {
            match loader.load(&url).await {
                Ok(()) => {
                    debug!(url = %url, "Onboarding image cached");
                    ImageStatus::LOADED
                }
                Err(e) => {
                    warn!(url = %url, "Onboarding image unavailable: {}", e);
                    ImageStatus::FAILED
                }
            }
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::ImageLoadError;

    /// Loader that counts fetches and fails for URLs in `broken`.
    #[derive(Default)]
    pub(crate) struct CountingLoader {
        pub fetches: AtomicUsize,
        pub broken: HashSet<String>,
        pub delay: Duration,
    }

    impl CountingLoader {
        pub fn failing(urls: &[&str]) -> Self {
            Self {
                broken: urls.iter().map(|u| u.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }

        pub fn count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageLoader for CountingLoader {
        async fn load(&self, url: &str) -> Result<(), ImageLoadError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.broken.contains(url) {
                Err(ImageLoadError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn unknown_url_has_no_status() {
        let cache = ImageCache::new(Arc::new(CountingLoader::default()));
        assert!(cache.status("/a.png").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fetch() {
        let loader = Arc::new(CountingLoader::slow(Duration::from_millis(20)));
        let cache = ImageCache::new(loader.clone());

        let results = join_all((0..8).map(|_| cache.ensure_loaded("/a.png"))).await;

        assert_eq!(loader.count(), 1);
        assert!(results.iter().all(|s| *s == ImageStatus::LOADED));
        assert_eq!(cache.status("/a.png"), Some(ImageStatus::LOADED));
    }

    #[tokio::test]
    async fn in_flight_load_is_not_reported_as_settled() {
        let loader = Arc::new(CountingLoader::slow(Duration::from_millis(50)));
        let cache = ImageCache::new(loader);

        let task = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.ensure_loaded("/slow.png").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.status("/slow.png").is_none());
        assert_eq!(cache.len(), 1);

        task.await.unwrap();
        assert_eq!(cache.status("/slow.png"), Some(ImageStatus::LOADED));
    }

    #[tokio::test]
    async fn failure_is_recorded_and_never_retried() {
        let loader = Arc::new(CountingLoader::failing(&["/missing.png"]));
        let cache = ImageCache::new(loader.clone());

        assert_eq!(cache.ensure_loaded("/missing.png").await, ImageStatus::FAILED);
        assert_eq!(cache.ensure_loaded("/missing.png").await, ImageStatus::FAILED);
        assert_eq!(loader.count(), 1);
        assert_eq!(cache.status("/missing.png"), Some(ImageStatus::FAILED));
    }

    #[tokio::test]
    async fn preload_all_fetches_each_url_once() {
        let loader = Arc::new(CountingLoader::default());
        let cache = ImageCache::new(loader.clone());

        cache
            .preload_all(["/a.png", "/b.png", "/a.png", "/c.png"])
            .await;

        assert_eq!(loader.count(), 3);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.status("/b.png"), Some(ImageStatus::LOADED));
    }
}
