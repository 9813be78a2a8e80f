//! TrueType font embedding for overlay text.
//!
//! Fonts arrive as raw bytes from a font source at runtime and are embedded
//! as a CIDFont with Identity-H encoding, so any character the font covers
//! can be drawn regardless of script.
//!
//! # PDF Font Structure
//!
//! For Unicode text, PDFs use a composite font structure:
//! - **Type0 font**: The top-level font dictionary that references:
//!   - **CIDFont**: Contains glyph metrics and references:
//!     - **FontDescriptor**: Font metadata (flags, bounding box, etc.)
//!     - **FontFile2**: The embedded TrueType font program
//!   - **ToUnicode CMap**: Maps glyph IDs back to Unicode for copy/paste

use std::collections::BTreeMap;
use std::fmt::Write;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::Face;

use crate::error::{Error, Result};
use super::content::register_resource;

/// Maximum entries per `beginbfchar` block allowed by the CMap format.
const BFCHAR_CHUNK: usize = 100;

/// A parsed TrueType font ready to be embedded into documents.
pub struct EmbeddedFont<'a> {
    face: Face<'a>,
    data: &'a [u8],
    base_font: String,
}

impl<'a> EmbeddedFont<'a> {
    /// Parse font bytes. `fallback_name` names the font in the PDF when the
    /// font carries no usable PostScript name.
    pub fn parse(data: &'a [u8], fallback_name: &str) -> Result<Self> {
        let face = Face::parse(data, 0)
            .map_err(|e| Error::FontLoad(format!("Failed to parse font '{fallback_name}': {e}")))?;

        if face.tables().glyf.is_none() {
            return Err(Error::FontLoad(format!(
                "font '{fallback_name}' has no TrueType outlines (CFF fonts are not supported)"
            )));
        }

        let postscript_name = face
            .names()
            .into_iter()
            .filter(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .find_map(|name| name.to_string());

        let base_font = pdf_name(postscript_name.as_deref().unwrap_or(fallback_name));

        Ok(Self {
            face,
            data,
            base_font,
        })
    }

    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    /// Get the glyph ID for a character, falling back to .notdef (0) if not found.
    pub fn glyph_id(&self, c: char) -> u16 {
        self.face.glyph_index(c).map_or(0, |g| g.0)
    }

    /// Get the advance width of a glyph in font units.
    pub fn glyph_width(&self, glyph_id: u16) -> u16 {
        self.face
            .glyph_hor_advance(ttf_parser::GlyphId(glyph_id))
            .unwrap_or(0)
    }

    /// Convert text to a hex string of glyph IDs for PDF content streams.
    /// Returns the hex string without angle brackets.
    pub fn text_to_hex_glyphs(&self, text: &str) -> String {
        text.chars().fold(String::new(), |mut acc, c| {
            let _ = write!(acc, "{:04X}", self.glyph_id(c));
            acc
        })
    }

    /// Embed this font into a document, register it on a page, and return the
    /// resource name to use in content streams.
    ///
    /// Widths and Unicode mappings are written for the glyphs of `text` only.
    pub fn embed_in_document(&self, doc: &mut Document, page_id: ObjectId, text: &str) -> Result<String> {
        let used = self.used_glyphs(text);

        let font_file_id = self.create_font_file(doc);
        let font_descriptor_id = self.create_font_descriptor(doc, font_file_id);
        let cid_font_id = self.create_cid_font(doc, font_descriptor_id, &used);
        let to_unicode_id = create_to_unicode_cmap(doc, &used);
        let type0_font_id = self.create_type0_font(doc, cid_font_id, to_unicode_id);

        register_resource(doc, page_id, "Font", "FEdit", type0_font_id)
    }

    /// Glyphs needed to draw `text`, keyed by glyph ID.
    fn used_glyphs(&self, text: &str) -> BTreeMap<u16, char> {
        text.chars()
            .filter(|c| !c.is_control())
            .map(|c| (self.glyph_id(c), c))
            .filter(|(gid, _)| *gid != 0)
            .collect()
    }

    /// Create the FontFile2 stream containing the raw TrueType data.
    #[allow(clippy::cast_possible_wrap)]
    fn create_font_file(&self, doc: &mut Document) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set("Length1", Object::Integer(self.data.len() as i64));

        let stream = Stream::new(dict, self.data.to_vec()).with_compression(true);
        doc.add_object(Object::Stream(stream))
    }

    /// Create the FontDescriptor dictionary with font metrics.
    fn create_font_descriptor(&self, doc: &mut Document, font_file_id: ObjectId) -> ObjectId {
        let bbox = self.face.global_bounding_box();
        let cap_height = self
            .face
            .capital_height()
            .unwrap_or_else(|| self.face.ascender());

        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", Object::Name(self.base_font.as_bytes().to_vec())),
            ("Flags", Object::Integer(32)), // Nonsymbolic
            (
                "FontBBox",
                Object::Array(vec![
                    Object::Integer(i64::from(bbox.x_min)),
                    Object::Integer(i64::from(bbox.y_min)),
                    Object::Integer(i64::from(bbox.x_max)),
                    Object::Integer(i64::from(bbox.y_max)),
                ]),
            ),
            ("ItalicAngle", Object::Integer(0)),
            ("Ascent", Object::Integer(i64::from(self.face.ascender()))),
            ("Descent", Object::Integer(i64::from(self.face.descender()))),
            ("CapHeight", Object::Integer(i64::from(cap_height))),
            ("StemV", Object::Integer(80)),
            ("FontFile2", Object::Reference(font_file_id)),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    /// Create the CIDFont dictionary with per-glyph width information.
    fn create_cid_font(
        &self,
        doc: &mut Document,
        font_descriptor_id: ObjectId,
        used: &BTreeMap<u16, char>,
    ) -> ObjectId {
        let widths_array = self.build_widths_array(used);
        let default_width = self.scale_width(self.glyph_width(self.glyph_id(' ')));

        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("BaseFont", Object::Name(self.base_font.as_bytes().to_vec())),
            (
                "CIDSystemInfo",
                Object::Dictionary(Dictionary::from_iter([
                    ("Registry", Object::String(b"Adobe".to_vec(), StringFormat::Literal)),
                    ("Ordering", Object::String(b"Identity".to_vec(), StringFormat::Literal)),
                    ("Supplement", Object::Integer(0)),
                ])),
            ),
            ("FontDescriptor", Object::Reference(font_descriptor_id)),
            ("DW", Object::Integer(default_width)),
            ("W", Object::Array(widths_array)),
            ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    /// Scale a font-unit width to PDF's 1000-unit system.
    fn scale_width(&self, width: u16) -> i64 {
        let units_per_em = i64::from(self.face.units_per_em()).max(1);
        (i64::from(width) * 1000) / units_per_em
    }

    /// Build the W (widths) array for CIDFont.
    /// The W array format is: [gid [w1 w2 ...]] for consecutive GIDs starting at gid.
    fn build_widths_array(&self, used: &BTreeMap<u16, char>) -> Vec<Object> {
        let mut result = Vec::new();
        let mut iter = used.keys().copied().peekable();

        while let Some(first_gid) = iter.next() {
            let mut widths = vec![Object::Integer(self.scale_width(self.glyph_width(first_gid)))];
            let mut expected_next = first_gid.wrapping_add(1);

            while let Some(&gid) = iter.peek() {
                if gid != expected_next {
                    break;
                }
                widths.push(Object::Integer(self.scale_width(self.glyph_width(gid))));
                expected_next = gid.wrapping_add(1);
                iter.next();
            }

            result.push(Object::Integer(i64::from(first_gid)));
            result.push(Object::Array(widths));
        }

        result
    }

    /// Create the Type0 (composite) font dictionary.
    fn create_type0_font(&self, doc: &mut Document, cid_font_id: ObjectId, to_unicode_id: ObjectId) -> ObjectId {
        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", Object::Name(self.base_font.as_bytes().to_vec())),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)])),
            ("ToUnicode", Object::Reference(to_unicode_id)),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }
}

/// Create a ToUnicode CMap mapping each used glyph ID back to its character.
fn create_to_unicode_cmap(doc: &mut Document, used: &BTreeMap<u16, char>) -> ObjectId {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo <<
  /Registry (Adobe)
  /Ordering (UCS)
  /Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
",
    );

    let entries: Vec<_> = used.iter().collect();
    for chunk in entries.chunks(BFCHAR_CHUNK) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for (gid, c) in chunk {
            let mut units = [0u16; 2];
            let utf16 = c.encode_utf16(&mut units).iter().fold(String::new(), |mut acc, u| {
                let _ = write!(acc, "{u:04X}");
                acc
            });
            let _ = writeln!(cmap, "<{gid:04X}> <{utf16}>");
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap
CMapName currentdict /CMap defineresource pop
end
end",
    );

    let stream = Stream::new(Dictionary::new(), cmap.into_bytes());
    doc.add_object(Object::Stream(stream))
}

/// Restrict a font name to characters that need no escaping in a PDF name.
fn pdf_name(name: &str) -> String {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
        .collect();

    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}
