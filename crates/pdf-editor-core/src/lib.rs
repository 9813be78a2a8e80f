//! PDF Editor Core Library
//!
//! This library provides the core functionality for editing PDF documents:
//! - Merging several PDFs into one and reordering pages
//! - Overlaying PNG/JPEG images and multi-line text onto pages
//! - Fetching TrueType fonts for text overlays (HTTP or local, cached)
//! - An editing session that folds every operation into one edited document

pub mod config;
pub mod error;
pub mod fonts;
pub mod pdf;
pub mod session;
pub mod util;

pub use config::{AppConfig, FontConfig, OutputNames, RgbColor, TextDefaults, color_options};
pub use error::{Error, Result};
pub use fonts::{CachedFontSource, DirFontSource, FontAsset, FontSource, HttpFontSource, font_source_for};
pub use pdf::{
    ImageKind, PageIndex, PdfDocument, Point, Rect, TextStyle, merge_pdfs, overlay_image,
    overlay_text, reorder_pages,
};
pub use session::{
    Action, Confirm, EditSession, ExportedPdf, MediaKind, Notice, PendingOverlay, SessionSnapshot,
    SourceFile,
};

impl TextStyle {
    /// Style from configured defaults, using the configured default font.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            font_size: config.text.font_size,
            color: config.text.color,
            font: config.fonts.default_font.clone(),
        }
    }
}
