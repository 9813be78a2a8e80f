//! Page resources and content stream plumbing shared by the overlay operators.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Maximum page-tree depth walked when looking for inherited Resources.
const MAX_INHERIT_DEPTH: usize = 10;

/// Resolve the Resources dictionary for a page, handling indirect references
/// and inheritance from parent Pages nodes.
///
/// PDF pages can have Resources as:
/// - An inline dictionary: `/Resources << /Font << ... >> >>`
/// - An indirect reference: `/Resources 5 0 R`
/// - Inherited from a parent Pages node
pub(crate) fn resolve_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    if let Ok(res_obj) = page_dict.get(b"Resources")
        && let Some(dict) = resolve_dict_object(doc, res_obj)
    {
        return Ok(dict);
    }

    let mut parent = page_dict.get(b"Parent").ok();
    for _ in 0..MAX_INHERIT_DEPTH {
        let Some(Object::Reference(parent_id)) = parent else {
            break;
        };
        let Ok(parent_dict) = doc.get_dictionary(*parent_id) else {
            break;
        };

        if let Ok(res_obj) = parent_dict.get(b"Resources")
            && let Some(dict) = resolve_dict_object(doc, res_obj)
        {
            return Ok(dict);
        }
        parent = parent_dict.get(b"Parent").ok();
    }

    Ok(Dictionary::new())
}

/// Resolve an object that should be a Dictionary (handles References).
pub(crate) fn resolve_dict_object(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(ref_id) => match doc.get_object(*ref_id) {
            Ok(Object::Dictionary(d)) => Some(d.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Register `object_id` in the page's `category` resources (`XObject`, `Font`)
/// under a fresh name starting with `prefix`, and return that name.
///
/// Existing entries are never overwritten, so repeated overlays on the same
/// page keep drawing their own resources. The merged Resources dictionary is
/// written inline onto the page, which also detaches it from any shared or
/// inherited dictionary.
pub(crate) fn register_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    prefix: &str,
    object_id: ObjectId,
) -> Result<String> {
    let mut resources = resolve_resources(doc, page_id)?;

    let mut entries = resources
        .get(category.as_bytes())
        .ok()
        .and_then(|obj| resolve_dict_object(doc, obj))
        .unwrap_or_default();

    let name = (0..)
        .map(|n| format!("{prefix}{n}"))
        .find(|candidate| !entries.has(candidate.as_bytes()))
        .unwrap_or_else(|| prefix.to_string());

    entries.set(name.as_bytes().to_vec(), Object::Reference(object_id));
    resources.set(category.as_bytes().to_vec(), Object::Dictionary(entries));

    let page_dict = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// Append a content stream to a page so it draws above the existing content.
///
/// The existing content is bracketed with `q`/`Q` first, so whatever graphics
/// state it leaves behind (transforms, colors, clipping) does not leak into the
/// overlay.
pub(crate) fn append_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let existing = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?
        .get(b"Contents")
        .ok()
        .cloned();

    let existing_streams = match existing {
        Some(Object::Reference(id)) => match doc.get_object(id) {
            // An indirect array of stream references.
            Ok(Object::Array(arr)) => arr.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(Object::Array(arr)) => arr,
        _ => Vec::new(),
    };

    let contents = if existing_streams.is_empty() {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        vec![Object::Reference(content_id)]
    } else {
        let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

        let mut restored = b"Q\n".to_vec();
        restored.extend_from_slice(&content);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), restored));

        let mut contents = Vec::with_capacity(existing_streams.len() + 2);
        contents.push(Object::Reference(save_id));
        contents.extend(existing_streams);
        contents.push(Object::Reference(content_id));
        contents
    };

    let page_dict = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    page_dict.set("Contents", Object::Array(contents));

    Ok(())
}
