// lopdf helper - Pure Rust PDF operations
use anyhow::{anyhow, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;

/// Load a PDF document using lopdf
pub fn load_pdf(path: &Path) -> Result<Document> {
    let document = Document::load(path)
        .map_err(|e| anyhow!("failed to open {}: {}", path.display(), e))?;
    if document.is_encrypted() {
        return Err(anyhow!("{} is encrypted", path.display()));
    }
    Ok(document)
}

/// Page object ids in page order, 0-based.
pub fn page_ids(document: &Document) -> Vec<ObjectId> {
    document.get_pages().into_values().collect()
}

/// Follow a single indirect reference, if any.
pub fn resolve<'a>(document: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => document.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

pub fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Look up a page attribute, walking up the page tree for inherited keys
/// such as `MediaBox` and `Resources`.
pub fn inherited<'a>(document: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = page;
    // Page trees are shallow; the bound guards against Parent cycles.
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return Some(resolve(document, value));
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = document.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

/// `[llx, lly, urx, ury]` of a page, defaulting to US Letter.
pub fn media_box(document: &Document, page_id: ObjectId) -> [f32; 4] {
    let letter = [0.0, 0.0, 612.0, 792.0];
    let Ok(page) = document.get_object(page_id).and_then(Object::as_dict) else {
        return letter;
    };
    let Some(Object::Array(arr)) = inherited(document, page, b"MediaBox") else {
        return letter;
    };
    let nums: Vec<f32> = arr
        .iter()
        .filter_map(|o| as_number(resolve(document, o)))
        .collect();
    match nums.as_slice() {
        [a, b, c, d] => [*a, *b, *c, *d],
        _ => letter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn media_box_is_inherited_from_parent() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
            }),
        );
        assert_eq!(media_box(&doc, page_id), [0.0, 0.0, 300.0, 400.0]);
    }

    #[test]
    fn missing_media_box_defaults_to_letter() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });
        assert_eq!(media_box(&doc, page_id), [0.0, 0.0, 612.0, 792.0]);
    }
}
