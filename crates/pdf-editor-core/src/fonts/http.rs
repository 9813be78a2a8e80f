use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{Error, Result};
use crate::util::join_base;
use super::{FontAsset, FontSource};

/// Fetches fonts from `base_url` + file name.
pub struct HttpFontSource {
    client: Client,
    /// Base URL the font file name is appended to (e.g. "https://cdn.example.com/fonts/")
    pub base_url: String,
}

impl HttpFontSource {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::FontLoad(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url_for(&self, font: &str) -> String {
        join_base(&self.base_url, &urlencoding::encode(font))
    }
}

#[async_trait]
impl FontSource for HttpFontSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn load(&self, font: &str) -> Result<FontAsset> {
        let url = self.url_for(font);
        debug!("Fetching font from {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::FontLoad(format!("Failed to fetch {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::FontLoad(format!("HTTP {status} fetching {url}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::FontLoad(format!("Failed to read font body from {url}: {e}")))?;

        debug!("Fetched font {font} ({} bytes)", bytes.len());
        Ok(FontAsset::new(font, bytes))
    }
}
