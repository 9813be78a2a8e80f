use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use super::{FontAsset, FontSource};

/// Reads fonts from a local directory.
pub struct DirFontSource {
    dir: PathBuf,
}

impl DirFontSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl FontSource for DirFontSource {
    fn name(&self) -> &'static str {
        "dir"
    }

    async fn load(&self, font: &str) -> Result<FontAsset> {
        // Font names are plain file names, never paths.
        if font.is_empty() || font.contains(['/', '\\']) || font == ".." {
            return Err(Error::FontLoad(format!("invalid font name '{font}'")));
        }

        let path = self.dir.join(font);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::FontLoad(format!("Failed to read {}: {e}", path.display())))?;

        debug!("Loaded font {} ({} bytes)", path.display(), bytes.len());
        Ok(FontAsset::new(font, bytes))
    }
}
