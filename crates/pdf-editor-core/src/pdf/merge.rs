//! Page-copying operators: merging whole documents and reordering pages.

use tracing::{debug, info};

use crate::error::{Error, Result};
use super::document::PdfDocument;

/// Concatenate PDFs in input order into one document.
///
/// Every page of every input is copied, keeping per-file page order. If any
/// input fails to parse, nothing is produced and the error names the
/// offending input's position.
pub fn merge_pdfs<B: AsRef<[u8]>>(inputs: &[B]) -> Result<Vec<u8>> {
    let mut merged = PdfDocument::create_empty();

    for (position, input) in inputs.iter().enumerate() {
        let source = PdfDocument::load(input.as_ref()).map_err(|e| Error::Merge {
            position,
            source: Box::new(e),
        })?;

        let page_indices: Vec<usize> = (0..source.page_count()).collect();
        merged
            .copy_pages(&source, &page_indices)
            .map_err(|e| Error::Merge {
                position,
                source: Box::new(e),
            })?;

        debug!("Merged input #{} ({} pages)", position + 1, page_indices.len());
    }

    merged.prune_unreferenced();
    info!(
        "Merged {} documents into {} pages",
        inputs.len(),
        merged.page_count()
    );

    merged.save()
}

/// Rebuild a document with its pages in `order` (zero-based indices).
///
/// Indices may repeat or leave pages out; the output has exactly
/// `order.len()` pages.
pub fn reorder_pages(pdf_bytes: &[u8], order: &[usize]) -> Result<Vec<u8>> {
    if order.is_empty() {
        return Err(Error::InvalidPageOrder(
            "page order must name at least one page".to_string(),
        ));
    }

    let source = PdfDocument::load(pdf_bytes)?;
    let mut reordered = PdfDocument::create_empty();
    reordered.copy_pages(&source, order)?;
    reordered.prune_unreferenced();

    debug!("Reordered {} pages into {:?}", source.page_count(), order);
    reordered.save()
}
