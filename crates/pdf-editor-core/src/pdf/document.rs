//! Thin adapter over `lopdf::Document`.
//!
//! Every operator in the crate goes through this type: load bytes, mutate,
//! save bytes. Nothing here knows about sessions or overlays.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{Error, Result};
use super::page_index::PageIndex;

/// Page attributes a page may inherit from its ancestors in the page tree.
///
/// Copied pages are re-parented under a different root, so these must be
/// resolved and written onto the page itself first.
const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Object types that belong to a document's structure rather than its content.
const STRUCTURAL_TYPES: [&[u8]; 7] = [
    b"Catalog", b"Pages", b"Page", b"Outlines", b"Outline", b"XRef", b"ObjStm",
];

/// Maximum page-tree depth walked when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 32;

/// Handle to an object id of a page inside a [`PdfDocument`].
pub type PageHandle = ObjectId;

/// An in-memory PDF document.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    inner: Document,
}

impl PdfDocument {
    /// Parse a PDF from bytes.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(bytes).map_err(Error::pdf_parse)?;

        // A trailer without a page tree is not something we can edit.
        inner
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|e| Error::pdf_parse(format!("missing page tree: {e}")))?;

        debug!("Loaded PDF ({} bytes, {} pages)", bytes.len(), inner.get_pages().len());
        Ok(Self { inner })
    }

    /// Create a document with an empty page tree.
    pub fn create_empty() -> Self {
        let mut inner = Document::with_version("1.7");

        let pages_id = inner.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![])),
            ("Count", Object::Integer(0)),
        ]));

        let catalog_id = inner.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));

        inner.trailer.set("Root", Object::Reference(catalog_id));

        Self { inner }
    }

    /// Serialize the document.
    pub fn save(&mut self) -> Result<Vec<u8>> {
        self.inner.compress();

        let mut output = Vec::new();
        self.inner
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;

        Ok(output)
    }

    /// Ordered page handles.
    pub fn pages(&self) -> Vec<PageHandle> {
        self.inner.get_pages().into_values().collect()
    }

    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Look up a page by zero-based index.
    pub fn page(&self, page_num: usize) -> Result<PageHandle> {
        let pages = self.inner.get_pages();
        let index = PageIndex::try_from_page_num(page_num, pages.len())?;

        pages
            .get(&index.as_lopdf_page_number()?)
            .copied()
            .ok_or(Error::PageIndexOutOfRange {
                page: page_num,
                total: pages.len(),
            })
    }

    /// Decoded content of a page (all content streams concatenated).
    pub fn page_content(&self, page_num: usize) -> Result<Vec<u8>> {
        let page_id = self.page(page_num)?;
        self.inner
            .get_page_content(page_id)
            .map_err(|e| Error::Lopdf(format!("Failed to read page content: {e}")))
    }

    /// Names registered under a resource category (e.g. `XObject`, `Font`) for a page.
    pub fn resource_names(&self, page_num: usize, category: &[u8]) -> Result<Vec<String>> {
        let page_id = self.page(page_num)?;
        let resources = super::content::resolve_resources(&self.inner, page_id)?;

        let names = resources
            .get(category)
            .ok()
            .and_then(|obj| super::content::resolve_dict_object(&self.inner, obj))
            .map(|dict| {
                dict.iter()
                    .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
                    .collect()
            })
            .unwrap_or_default();

        Ok(names)
    }

    /// Append copies of `source` pages, in the order given by `page_indices`.
    ///
    /// Indices may repeat; every copy gets its own page object. Content and
    /// resource objects of the source are carried over with fresh object ids.
    pub fn copy_pages(&mut self, source: &Self, page_indices: &[usize]) -> Result<Vec<PageHandle>> {
        let total = source.page_count();
        for &page in page_indices {
            PageIndex::try_from_page_num(page, total)?;
        }

        let mut src = source.inner.clone();
        src.renumber_objects_with(self.inner.max_id + 1);
        let src_pages = src.get_pages().into_values().collect::<Vec<_>>();

        // Resolve inherited attributes before the source tree is discarded.
        let mut copied_pages = Vec::with_capacity(page_indices.len());
        for &page in page_indices {
            let page_id = src_pages[page];
            let mut dict = src
                .get_dictionary(page_id)
                .map_err(|e| Error::Lopdf(format!("Failed to read page {page}: {e}")))?
                .clone();

            for key in INHERITABLE_PAGE_KEYS {
                if !dict.has(key)
                    && let Some(value) = inherited_attribute(&src, page_id, key)
                {
                    dict.set(key.to_vec(), value);
                }
            }
            copied_pages.push((page_id, dict));
        }

        let src_max_id = src.max_id;
        for (object_id, object) in src.objects {
            let type_name = object.type_name().unwrap_or(b"");
            if !STRUCTURAL_TYPES.contains(&type_name) {
                self.inner.objects.insert(object_id, object);
            }
        }
        self.inner.max_id = self.inner.max_id.max(src_max_id);

        let pages_root = self.pages_root()?;
        let mut reused = HashSet::new();
        let mut handles = Vec::with_capacity(copied_pages.len());

        for (src_page_id, mut dict) in copied_pages {
            dict.set("Parent", Object::Reference(pages_root));

            // The first copy keeps the original id so annotation back-references stay valid.
            let handle = if reused.insert(src_page_id) {
                self.inner.objects.insert(src_page_id, Object::Dictionary(dict));
                src_page_id
            } else {
                self.inner.add_object(Object::Dictionary(dict))
            };
            handles.push(handle);
        }

        self.append_to_page_tree(pages_root, &handles)?;

        debug!(
            "Copied {} pages (document now has {} pages)",
            handles.len(),
            self.page_count()
        );
        Ok(handles)
    }

    /// Drop objects no longer reachable from the trailer.
    pub fn prune_unreferenced(&mut self) {
        let removed = self.inner.prune_objects();
        if !removed.is_empty() {
            debug!("Pruned {} unreferenced objects", removed.len());
        }
    }

    pub(crate) const fn inner(&self) -> &Document {
        &self.inner
    }

    pub(crate) const fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    fn pages_root(&self) -> Result<ObjectId> {
        self.inner
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|e| Error::Lopdf(format!("Failed to find page tree root: {e}")))
    }

    fn append_to_page_tree(&mut self, pages_root: ObjectId, handles: &[PageHandle]) -> Result<()> {
        let pages_dict = self
            .inner
            .get_dictionary_mut(pages_root)
            .map_err(|e| Error::Lopdf(format!("Failed to get page tree root: {e}")))?;

        let mut kids = match pages_dict.get(b"Kids") {
            Ok(Object::Array(kids)) => kids.clone(),
            _ => Vec::new(),
        };
        kids.extend(handles.iter().map(|&id| Object::Reference(id)));

        let count = match pages_dict.get(b"Count") {
            Ok(Object::Integer(count)) => *count,
            _ => 0,
        };

        #[allow(clippy::cast_possible_wrap)]
        let added = handles.len() as i64;

        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(count + added));
        Ok(())
    }
}

/// Walk up the page tree looking for an attribute.
///
/// Uses a depth limit to avoid looping on malformed PDFs with circular
/// Parent references.
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;

    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }

    None
}
