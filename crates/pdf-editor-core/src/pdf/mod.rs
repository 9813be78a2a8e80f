mod content;
mod document;
mod font;
mod image;
mod merge;
mod overlay;
mod page_index;

#[cfg(test)]
pub(crate) mod testing;

pub use document::{PageHandle, PdfDocument};
pub use font::EmbeddedFont;
pub use image::{ImageKind, Rect, image_dimensions, overlay_image};
pub use merge::{merge_pdfs, reorder_pages};
pub use overlay::{LINE_HEIGHT_FACTOR, PlacedLine, Point, TextStyle, layout_lines, overlay_text};
pub use page_index::PageIndex;
