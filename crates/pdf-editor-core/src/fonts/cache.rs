use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use crate::error::Result;
use super::{FontAsset, FontSource};

/// In-memory font cache in front of another source, with byte-size-based eviction.
pub struct CachedFontSource {
    inner: Arc<dyn FontSource>,
    cache: Cache<String, FontAsset>,
}

impl CachedFontSource {
    pub fn new(inner: Arc<dyn FontSource>, max_mb: u64) -> Self {
        let max_bytes = max_mb.saturating_mul(1024 * 1024);

        let cache = Cache::builder()
            .max_capacity(max_bytes)
            .weigher(|_key: &String, value: &FontAsset| -> u32 {
                // Weight is the font byte size, capped at u32::MAX
                value.len().try_into().unwrap_or(u32::MAX)
            })
            .build();

        Self { inner, cache }
    }
}

#[async_trait]
impl FontSource for CachedFontSource {
    fn name(&self) -> &'static str {
        "cached"
    }

    async fn load(&self, font: &str) -> Result<FontAsset> {
        if let Some(asset) = self.cache.get(font).await {
            debug!("Font cache hit for {font}");
            return Ok(asset);
        }

        // Failures are not cached; the next request retries the backend.
        let asset = self.inner.load(font).await?;
        self.cache.insert(font.to_string(), asset.clone()).await;
        Ok(asset)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::Error;

    /// Counts backend calls; fails for fonts named "missing.ttf".
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FontSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn load(&self, font: &str) -> Result<FontAsset> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if font == "missing.ttf" {
                return Err(Error::FontLoad("HTTP 404".to_string()));
            }
            Ok(FontAsset::new(font, b"bytes".to_vec()))
        }
    }

    #[tokio::test]
    async fn test_second_load_hits_cache() {
        let backend = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedFontSource::new(backend.clone(), 1);

        cached.load("a.ttf").await.unwrap();
        cached.load("a.ttf").await.unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let backend = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedFontSource::new(backend.clone(), 1);

        assert!(cached.load("missing.ttf").await.is_err());
        assert!(cached.load("missing.ttf").await.is_err());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }
}
