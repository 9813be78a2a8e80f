//! Font assets for text overlays.
//!
//! Text overlays name a font file; a [`FontSource`] turns that name into
//! bytes, either over HTTP or from a local directory.

mod cache;
mod dir;
mod http;

pub use cache::CachedFontSource;
pub use dir::DirFontSource;
pub use http::HttpFontSource;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::FontConfig;
use crate::error::Result;

/// Raw font bytes plus the file name they were loaded under.
#[derive(Debug, Clone)]
pub struct FontAsset {
    name: String,
    bytes: Bytes,
}

impl FontAsset {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Trait for font asset backends
#[async_trait]
pub trait FontSource: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Fetch the font file called `font`.
    ///
    /// Any failure (missing file, non-2xx response, timeout) is reported as
    /// [`crate::Error::FontLoad`].
    async fn load(&self, font: &str) -> Result<FontAsset>;
}

/// Create a font source from configuration.
///
/// An `http(s)://` base selects [`HttpFontSource`], anything else is treated
/// as a directory. A non-zero cache budget wraps the source in
/// [`CachedFontSource`].
pub fn font_source_for(config: &FontConfig) -> Result<Arc<dyn FontSource>> {
    let source: Arc<dyn FontSource> = if config.is_remote() {
        Arc::new(HttpFontSource::new(&config.base_url, config.timeout_secs)?)
    } else {
        Arc::new(DirFontSource::new(&config.base_url))
    };

    if config.cache_max_mb == 0 {
        return Ok(source);
    }

    Ok(Arc::new(CachedFontSource::new(source, config.cache_max_mb)))
}
