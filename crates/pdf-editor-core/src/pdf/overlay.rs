//! Text overlay operator.
//!
//! # Coordinate System
//!
//! Anchors are given in PDF page space: (0, 0) is the bottom-left corner of
//! the page, X grows to the right and Y grows upward. The anchor is the
//! baseline origin of the first line; following lines step downward.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RgbColor;
use crate::error::{Error, Result};
use crate::fonts::FontAsset;
use super::content::append_content;
use super::document::PdfDocument;
use super::font::EmbeddedFont;

/// Line height as a multiple of font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// A point in PDF page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Style of a text overlay, everything except where it goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font size in points
    pub font_size: f32,
    pub color: RgbColor,
    /// Font file name, resolved through a font source
    pub font: String,
}

/// A line of overlay text with its baseline position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine<'a> {
    pub text: &'a str,
    pub x: f32,
    pub y: f32,
}

/// Split text into lines and compute each baseline.
///
/// Line `i` sits at `anchor.y - i * font_size * 1.2`. Lines that are blank
/// after trimming are left out but still take up their slot.
pub fn layout_lines(text: &str, anchor: Point, font_size: f32) -> Vec<PlacedLine<'_>> {
    let line_height = font_size * LINE_HEIGHT_FACTOR;

    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            #[allow(clippy::cast_precision_loss)]
            let y = anchor.y - i as f32 * line_height;
            PlacedLine {
                text: line,
                x: anchor.x,
                y,
            }
        })
        .collect()
}

/// Draw multi-line text onto one page of a PDF and return the new PDF bytes.
pub fn overlay_text(
    pdf_bytes: &[u8],
    page_num: usize,
    text: &str,
    anchor: Point,
    style: &TextStyle,
    font: &FontAsset,
) -> Result<Vec<u8>> {
    if !style.font_size.is_finite() || style.font_size <= 0.0 {
        return Err(Error::InvalidOverlayGeometry(format!(
            "font size must be positive, got {}",
            style.font_size
        )));
    }
    if !anchor.x.is_finite() || !anchor.y.is_finite() {
        return Err(Error::InvalidOverlayGeometry(format!(
            "anchor must be finite, got {anchor:?}"
        )));
    }

    let mut pdf = PdfDocument::load(pdf_bytes)?;
    let page_id = pdf.page(page_num)?;
    let embedded = EmbeddedFont::parse(font.bytes(), font.name())?;

    let lines = layout_lines(text, anchor, style.font_size);
    if lines.is_empty() {
        debug!("Text overlay on page {page_num} has no visible lines");
        return pdf.save();
    }

    let font_name = embedded.embed_in_document(pdf.inner_mut(), page_id, text)?;
    let content = create_text_content(&embedded, &font_name, &lines, style);
    append_content(pdf.inner_mut(), page_id, content.into_bytes())?;

    debug!(
        "Drew {} text lines with {} at {}pt on page {page_num}",
        lines.len(),
        embedded.base_font(),
        style.font_size
    );

    pdf.save()
}

/// Create the content stream drawing the placed lines.
fn create_text_content(
    font: &EmbeddedFont<'_>,
    font_name: &str,
    lines: &[PlacedLine<'_>],
    style: &TextStyle,
) -> String {
    use std::fmt::Write;

    let mut content = String::new();
    content.push_str("q\n");

    let (r, g, b) = style.color.to_unit();
    let _ = writeln!(content, "{r} {g} {b} rg");
    // Fill mode; pages with OCR layers may leave invisible mode (3) behind.
    content.push_str("0 Tr\n");

    for line in lines {
        content.push_str("BT\n");
        let _ = writeln!(content, "/{font_name} {} Tf", style.font_size);
        let _ = writeln!(content, "{} {} Td", line.x, line.y);
        let _ = writeln!(content, "<{}> Tj", font.text_to_hex_glyphs(line.text));
        content.push_str("ET\n");
    }

    content.push_str("Q\n");
    content
}
