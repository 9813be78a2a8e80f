//! Editing session: the working set of files, the cumulative edited document,
//! the page cursor, and overlays waiting for placement.
//!
//! Every mutating operation reads its input from [`EditSession::resolve_source_bytes`]
//! (the latest edit if there is one, the active file otherwise) and commits its
//! output as the new edited state. Failed operations leave the session as it was.

mod notice;
mod source;

pub use notice::{Action, Notice};
pub use source::{MediaKind, SourceFile};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::OutputNames;
use crate::error::{Error, Result};
use crate::fonts::FontSource;
use crate::pdf::{
    ImageKind, PageIndex, PdfDocument, Point, Rect, TextStyle, image_dimensions, layout_lines,
    merge_pdfs, overlay_image, overlay_text, reorder_pages,
};

/// Asks the user to confirm a destructive step.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// An overlay whose content is chosen but whose position is not.
///
/// The target page is captured when the overlay is requested.
#[derive(Debug, Clone)]
pub enum PendingOverlay {
    Image {
        name: String,
        kind: ImageKind,
        bytes: Bytes,
        /// Pixel size, for callers that keep the aspect ratio
        dimensions: (u32, u32),
        page: usize,
    },
    Text {
        text: String,
        style: TextStyle,
        page: usize,
    },
}

impl PendingOverlay {
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Image { .. } => "image",
            Self::Text { .. } => "text",
        }
    }

    pub const fn page(&self) -> usize {
        match self {
            Self::Image { page, .. } | Self::Text { page, .. } => *page,
        }
    }
}

/// The document handed to the download collaborator.
#[derive(Debug, Clone)]
pub struct ExportedPdf {
    pub filename: String,
    pub bytes: Bytes,
}

impl ExportedPdf {
    pub const MIME: &'static str = "application/pdf";
}

/// Serializable view of a session, for UIs.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub files: Vec<FileSummary>,
    pub active: Option<usize>,
    pub edited: bool,
    /// 1-based page number of the cursor
    pub page_number: usize,
    pub page_count: Option<usize>,
    pub pending_overlay: Option<PendingSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub kind: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingSummary {
    pub overlay: &'static str,
    pub page_number: usize,
}

/// A single user's editing session.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    files: Vec<SourceFile>,
    active: Option<usize>,
    edited: Option<Bytes>,
    page: usize,
    pending: Option<PendingOverlay>,
    output: OutputNames,
}

impl EditSession {
    pub fn new(output: OutputNames) -> Self {
        Self {
            output,
            ..Default::default()
        }
    }

    // =========================================================================
    // Working set
    // =========================================================================

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub const fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_file(&self) -> Option<&SourceFile> {
        self.active.and_then(|i| self.files.get(i))
    }

    /// Append files. The first of them becomes active if nothing is active yet.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = SourceFile>) -> Notice {
        let first_new = self.files.len();
        self.files.extend(files);
        let count = self.files.len() - first_new;

        if self.active.is_none() && count > 0 {
            self.active = Some(first_new);
        }

        debug!("Added {count} files (working set now {})", self.files.len());
        Notice::FilesAdded { count }
    }

    /// Remove a file by position. Removing the active file makes the new
    /// first file active and discards the edits made so far.
    pub fn remove_file(&mut self, index: usize) -> Result<Notice> {
        if index >= self.files.len() {
            return Err(Error::FileIndexOutOfRange {
                index,
                len: self.files.len(),
            });
        }

        let removed = self.files.remove(index);
        let edits_cleared = match self.active {
            Some(active) if active == index => {
                self.active = (!self.files.is_empty()).then_some(0);
                self.edited = None;
                self.pending = None;
                self.page = 0;
                true
            }
            Some(active) if active > index => {
                self.active = Some(active - 1);
                false
            }
            _ => false,
        };

        debug!("Removed {} (edits cleared: {edits_cleared})", removed.name());
        Ok(Notice::FileRemoved {
            name: removed.name().to_string(),
            edits_cleared,
        })
    }

    /// Make another file active. Edits are kept: previews and operations keep
    /// working on the edited document until it is reset.
    pub fn select_active(&mut self, index: usize) -> Result<Notice> {
        let file = self.files.get(index).ok_or(Error::FileIndexOutOfRange {
            index,
            len: self.files.len(),
        })?;
        let name = file.name().to_string();

        self.active = Some(index);
        self.clamp_page();
        Ok(Notice::ActiveChanged { name })
    }

    // =========================================================================
    // Edit state
    // =========================================================================

    pub const fn has_edits(&self) -> bool {
        self.edited.is_some()
    }

    /// Input bytes for the next operation: the latest edit, else the active file.
    pub fn resolve_source_bytes(&self) -> Result<Bytes> {
        self.edited
            .clone()
            .or_else(|| self.active_file().map(|f| f.bytes().clone()))
            .ok_or(Error::NoActiveDocument)
    }

    /// Replace the edited state with an operation's output.
    pub fn commit(&mut self, bytes: impl Into<Bytes>) {
        let bytes = bytes.into();
        debug!(
            "Committed edit ({} bytes, {})",
            bytes.len(),
            crate::util::fingerprint(&bytes)
        );
        self.edited = Some(bytes);
    }

    /// Discard all edits after the user confirms. Without edits this is a
    /// no-op and no confirmation is asked for.
    pub fn reset(&mut self, confirm: &mut impl Confirm) -> Notice {
        if self.edited.is_none() {
            return Notice::NothingToReset;
        }
        if !confirm.confirm("Are you sure you want to reset all changes?") {
            return Notice::ResetDeclined;
        }

        self.edited = None;
        self.pending = None;
        self.page = 0;
        info!("Session edits reset");
        Notice::Reset
    }

    /// The edited document, named for download.
    pub fn export_current(&self) -> Result<ExportedPdf> {
        let bytes = self.edited.clone().ok_or(Error::NothingToExport)?;
        Ok(ExportedPdf {
            filename: self.output.export.clone(),
            bytes,
        })
    }

    // =========================================================================
    // Preview and page cursor
    // =========================================================================

    /// Bytes of the document currently shown: the edit if any, else the active file.
    pub fn preview_bytes(&self) -> Option<&Bytes> {
        self.edited
            .as_ref()
            .or_else(|| self.active_file().map(SourceFile::bytes))
    }

    pub fn preview_page_count(&self) -> Result<usize> {
        let bytes = self.preview_bytes().ok_or(Error::NoActiveDocument)?;
        Ok(PdfDocument::load(bytes)?.page_count())
    }

    /// Zero-based page cursor.
    pub const fn page_index(&self) -> usize {
        self.page
    }

    /// One-based page number shown to users.
    pub const fn page_number(&self) -> usize {
        self.page + 1
    }

    pub fn set_page(&mut self, index: usize) -> Result<Notice> {
        let total = self.preview_page_count()?;
        let index = PageIndex::try_from_page_num(index, total)?;
        self.page = index.as_usize();
        Ok(Notice::PageChanged {
            number: index.display_number(),
        })
    }

    pub fn set_page_number(&mut self, number: usize) -> Result<Notice> {
        let total = self.preview_page_count()?;
        let index = PageIndex::try_from_display_number(number, total)?;
        self.set_page(index.as_usize())
    }

    fn clamp_page(&mut self) {
        let total = self.preview_page_count().unwrap_or_else(|e| {
            warn!("Cannot count pages of the previewed document, resetting page cursor: {e}");
            0
        });
        if self.page >= total {
            self.page = 0;
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Merge every file of the working set, in order, into one document that
    /// replaces the working set and becomes the edit baseline.
    pub fn merge_all(&mut self) -> Result<Notice> {
        if self.files.len() < 2 {
            return Err(Error::NotEnoughFilesToMerge {
                count: self.files.len(),
            });
        }

        let inputs: Vec<&Bytes> = self.files.iter().map(SourceFile::bytes).collect();
        let merged = Bytes::from(merge_pdfs(&inputs)?);
        let pages = PdfDocument::load(&merged)?.page_count();
        let files = self.files.len();

        self.files = vec![SourceFile::new(
            self.output.merged.clone(),
            MediaKind::Pdf,
            merged.clone(),
        )];
        self.active = Some(0);
        self.pending = None;
        self.commit(merged);
        self.page = 0;

        info!("Merged {files} files into {pages} pages");
        Ok(Notice::Merged { files, pages })
    }

    /// Rearrange the pages of the current document (zero-based indices).
    pub fn reorder_pages(&mut self, order: &[usize]) -> Result<Notice> {
        let source = self.resolve_source_bytes()?;
        let reordered = reorder_pages(&source, order)?;

        self.commit(reordered);
        if self.page >= order.len() {
            self.page = 0;
        }

        Ok(Notice::Reordered { pages: order.len() })
    }

    /// Stage an image overlay for the current page.
    pub fn request_image_overlay(&mut self, image: SourceFile) -> Result<Notice> {
        self.resolve_source_bytes()?;
        let kind = image.kind().image_kind()?;
        let dimensions = image_dimensions(image.bytes(), kind)?;

        self.pending = Some(PendingOverlay::Image {
            name: image.name().to_string(),
            kind,
            bytes: image.bytes().clone(),
            dimensions,
            page: self.page,
        });

        Ok(Notice::OverlayRequested {
            overlay: "image",
            page_number: self.page_number(),
        })
    }

    /// Place the pending image. On failure the request stays pending.
    pub fn confirm_image_overlay(&mut self, rect: Rect) -> Result<Notice> {
        let PendingOverlay::Image {
            kind, bytes, page, ..
        } = self.pending_as("image")?
        else {
            return Err(Error::NoPendingOverlay);
        };
        let (kind, bytes, page) = (*kind, bytes.clone(), *page);

        let source = self.resolve_source_bytes()?;
        let output = overlay_image(&source, &bytes, kind, page, rect)?;

        self.commit(output);
        self.pending = None;
        info!("Placed image on page {}", page + 1);
        Ok(Notice::ImagePlaced { page_number: page + 1 })
    }

    /// Stage a text overlay for the current page.
    pub fn request_text_overlay(&mut self, text: impl Into<String>, style: TextStyle) -> Result<Notice> {
        self.resolve_source_bytes()?;

        self.pending = Some(PendingOverlay::Text {
            text: text.into(),
            style,
            page: self.page,
        });

        Ok(Notice::OverlayRequested {
            overlay: "text",
            page_number: self.page_number(),
        })
    }

    /// Place the pending text with its first baseline at `anchor`, fetching
    /// the font through `fonts`. On failure the request stays pending.
    pub async fn confirm_text_overlay(&mut self, anchor: Point, fonts: &dyn FontSource) -> Result<Notice> {
        let PendingOverlay::Text { text, style, page } = self.pending_as("text")? else {
            return Err(Error::NoPendingOverlay);
        };
        let (text, style, page) = (text.clone(), style.clone(), *page);

        let source = self.resolve_source_bytes()?;
        let font = fonts.load(&style.font).await?;
        let output = overlay_text(&source, page, &text, anchor, &style, &font)?;
        let lines = layout_lines(&text, anchor, style.font_size).len();

        self.commit(output);
        self.pending = None;
        info!("Placed {lines} text lines on page {}", page + 1);
        Ok(Notice::TextPlaced {
            page_number: page + 1,
            lines,
        })
    }

    /// Drop the pending overlay without touching the document.
    pub fn cancel_overlay(&mut self) -> Result<Notice> {
        self.pending.take().ok_or(Error::NoPendingOverlay)?;
        Ok(Notice::OverlayCancelled)
    }

    pub const fn pending(&self) -> Option<&PendingOverlay> {
        self.pending.as_ref()
    }

    fn pending_as(&self, requested: &'static str) -> Result<&PendingOverlay> {
        match &self.pending {
            None => Err(Error::NoPendingOverlay),
            Some(p) if p.kind_name() != requested => Err(Error::PendingOverlayMismatch {
                pending: p.kind_name(),
                requested,
            }),
            Some(p) => Ok(p),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            files: self
                .files
                .iter()
                .map(|f| FileSummary {
                    name: f.name().to_string(),
                    kind: f.kind().mime().to_string(),
                    size: f.len(),
                })
                .collect(),
            active: self.active,
            edited: self.has_edits(),
            page_number: self.page_number(),
            page_count: self.preview_page_count().ok(),
            pending_overlay: self.pending.as_ref().map(|p| PendingSummary {
                overlay: p.kind_name(),
                page_number: p.page() + 1,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::RgbColor;
    use crate::fonts::FontAsset;
    use crate::pdf::testing::{create_test_pdf, page_marker, png_bytes, test_font};
    use async_trait::async_trait;

    fn pdf_file(name: &str, markers: &[&str]) -> SourceFile {
        SourceFile::new(name, MediaKind::Pdf, create_test_pdf(markers))
    }

    fn style() -> TextStyle {
        TextStyle {
            font_size: 12.0,
            color: RgbColor::black(),
            font: "test.ttf".to_string(),
        }
    }

    struct StaticFont;

    #[async_trait]
    impl FontSource for StaticFont {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn load(&self, font: &str) -> Result<FontAsset> {
            Ok(FontAsset::new(font, test_font()))
        }
    }

    struct NoFonts;

    #[async_trait]
    impl FontSource for NoFonts {
        fn name(&self) -> &'static str {
            "none"
        }

        async fn load(&self, font: &str) -> Result<FontAsset> {
            Err(Error::FontLoad(format!("HTTP 404 fetching {font}")))
        }
    }

    #[test]
    fn test_first_added_file_becomes_active() {
        let mut session = EditSession::default();
        assert!(matches!(session.resolve_source_bytes(), Err(Error::NoActiveDocument)));

        session.add_files([pdf_file("a.pdf", &["A"]), pdf_file("b.pdf", &["B"])]);
        assert_eq!(session.active_file().unwrap().name(), "a.pdf");

        session.add_files([pdf_file("c.pdf", &["C"])]);
        assert_eq!(session.active_index(), Some(0));
    }

    #[test]
    fn test_select_active_keeps_edits() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A"]), pdf_file("b.pdf", &["B"])]);
        session.commit(create_test_pdf(&["edited"]));

        session.select_active(1).unwrap();
        assert!(session.has_edits());
        let preview = PdfDocument::load(session.preview_bytes().unwrap()).unwrap();
        assert_eq!(page_marker(&preview, 0), "edited");
    }

    #[test]
    fn test_selecting_unreadable_file_resets_cursor() {
        let mut session = EditSession::default();
        session.add_files([
            pdf_file("a.pdf", &["A", "B", "C"]),
            SourceFile::from_name("logo.png", png_bytes(2, 2, 255)),
        ]);
        session.set_page(2).unwrap();

        session.select_active(1).unwrap();
        assert_eq!(session.page_index(), 0);
        assert!(session.preview_page_count().is_err());
    }

    #[test]
    fn test_remove_active_file_clears_edits() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A"]), pdf_file("b.pdf", &["B"])]);
        session.commit(create_test_pdf(&["edited"]));

        let notice = session.remove_file(0).unwrap();
        assert_eq!(
            notice,
            Notice::FileRemoved {
                name: "a.pdf".to_string(),
                edits_cleared: true
            }
        );
        assert!(!session.has_edits());
        assert_eq!(session.active_file().unwrap().name(), "b.pdf");

        session.remove_file(0).unwrap();
        assert!(session.active_file().is_none());
        assert!(matches!(session.remove_file(0), Err(Error::FileIndexOutOfRange { .. })));
    }

    #[test]
    fn test_remove_before_active_shifts_index() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A"]), pdf_file("b.pdf", &["B"])]);
        session.select_active(1).unwrap();
        session.commit(create_test_pdf(&["edited"]));

        session.remove_file(0).unwrap();
        assert_eq!(session.active_file().unwrap().name(), "b.pdf");
        assert!(session.has_edits());
    }

    #[test]
    fn test_merge_needs_two_files() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A"])]);
        assert!(matches!(
            session.merge_all(),
            Err(Error::NotEnoughFilesToMerge { count: 1 })
        ));
        assert!(!session.has_edits());
    }

    #[test]
    fn test_merge_replaces_working_set() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A1", "A2"]), pdf_file("b.pdf", &["B1"])]);
        session.set_page(1).unwrap();

        let notice = session.merge_all().unwrap();
        assert_eq!(notice, Notice::Merged { files: 2, pages: 3 });
        assert_eq!(session.files().len(), 1);
        assert_eq!(session.files()[0].name(), "merged.pdf");
        assert_eq!(session.page_index(), 0);
        assert_eq!(
            session.export_current().unwrap().bytes,
            session.files()[0].bytes().clone()
        );
    }

    #[test]
    fn test_export_requires_edits() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A"])]);
        assert!(matches!(session.export_current(), Err(Error::NothingToExport)));

        session.commit(create_test_pdf(&["edited"]));
        let exported = session.export_current().unwrap();
        assert_eq!(exported.filename, "edited.pdf");
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A", "B"])]);

        let mut asked = false;
        let notice = session.reset(&mut |_: &str| {
            asked = true;
            true
        });
        assert_eq!(notice, Notice::NothingToReset);
        assert!(!asked, "no prompt without edits");

        session.commit(create_test_pdf(&["edited", "again"]));
        session.set_page(1).unwrap();
        assert_eq!(session.reset(&mut |_: &str| false), Notice::ResetDeclined);
        assert!(session.has_edits());

        assert_eq!(session.reset(&mut |_: &str| true), Notice::Reset);
        assert!(!session.has_edits());
        assert_eq!(session.page_index(), 0);
    }

    #[test]
    fn test_set_page_validates_range() {
        let mut session = EditSession::default();
        assert!(matches!(session.set_page(0), Err(Error::NoActiveDocument)));

        session.add_files([pdf_file("a.pdf", &["A", "B"])]);
        assert_eq!(session.set_page_number(2).unwrap(), Notice::PageChanged { number: 2 });
        assert_eq!(session.page_index(), 1);
        assert!(matches!(
            session.set_page(2),
            Err(Error::PageIndexOutOfRange { page: 2, total: 2 })
        ));
        assert!(session.set_page_number(0).is_err());
    }

    #[test]
    fn test_image_overlay_uses_page_captured_at_request() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A", "B"])]);
        session.set_page(1).unwrap();

        session
            .request_image_overlay(SourceFile::new("dot.png", MediaKind::Png, png_bytes(2, 2, 255)))
            .unwrap();
        session.set_page(0).unwrap();

        let notice = session
            .confirm_image_overlay(Rect::new(10.0, 10.0, 20.0, 20.0))
            .unwrap();
        assert_eq!(notice, Notice::ImagePlaced { page_number: 2 });
        assert!(session.pending().is_none());

        let doc = PdfDocument::load(session.preview_bytes().unwrap()).unwrap();
        assert_eq!(doc.resource_names(1, b"XObject").unwrap().len(), 1);
        assert!(doc.resource_names(0, b"XObject").unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_image_kind_rejected_at_request() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A"])]);

        let gif = SourceFile::from_name("anim.gif", b"GIF89a".to_vec());
        assert!(matches!(
            session.request_image_overlay(gif),
            Err(Error::UnsupportedImageKind(_))
        ));
        assert!(session.pending().is_none());
    }

    #[test]
    fn test_cancel_discards_pending_without_edit() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A"])]);
        session.request_text_overlay("hello", style()).unwrap();

        assert_eq!(session.cancel_overlay().unwrap(), Notice::OverlayCancelled);
        assert!(!session.has_edits());
        assert!(matches!(session.cancel_overlay(), Err(Error::NoPendingOverlay)));
    }

    #[test]
    fn test_confirm_wrong_overlay_kind() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A"])]);
        session.request_text_overlay("hello", style()).unwrap();

        assert!(matches!(
            session.confirm_image_overlay(Rect::new(0.0, 0.0, 1.0, 1.0)),
            Err(Error::PendingOverlayMismatch {
                pending: "text",
                requested: "image"
            })
        ));
        assert!(session.pending().is_some());
    }

    #[tokio::test]
    async fn test_text_overlay_commits_and_clears_pending() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A"])]);
        session.request_text_overlay("one\n\nthree", style()).unwrap();

        let notice = session
            .confirm_text_overlay(Point::new(72.0, 720.0), &StaticFont)
            .await
            .unwrap();
        assert_eq!(notice, Notice::TextPlaced { page_number: 1, lines: 2 });
        assert!(session.has_edits());
        assert!(session.pending().is_none());
    }

    #[tokio::test]
    async fn test_font_failure_keeps_state() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A"])]);
        session.request_text_overlay("hello", style()).unwrap();

        let result = session
            .confirm_text_overlay(Point::new(72.0, 720.0), &NoFonts)
            .await;
        assert!(matches!(result, Err(Error::FontLoad(_))));
        assert!(!session.has_edits());
        assert!(session.pending().is_some(), "request stays pending for a retry");
    }

    #[tokio::test]
    async fn test_edits_accumulate() {
        let mut session = EditSession::default();
        session.add_files([pdf_file("a.pdf", &["A"])]);

        session
            .request_image_overlay(SourceFile::new("dot.png", MediaKind::Png, png_bytes(2, 2, 255)))
            .unwrap();
        session
            .confirm_image_overlay(Rect::new(0.0, 0.0, 10.0, 10.0))
            .unwrap();

        session.request_text_overlay("caption", style()).unwrap();
        session
            .confirm_text_overlay(Point::new(0.0, 20.0), &StaticFont)
            .await
            .unwrap();

        let doc = PdfDocument::load(&session.export_current().unwrap().bytes).unwrap();
        assert_eq!(doc.resource_names(0, b"XObject").unwrap().len(), 1);
        assert!(doc.resource_names(0, b"Font").unwrap().contains(&"FEdit0".to_string()));
        assert_eq!(page_marker(&doc, 0), "A");
    }
}
