//! Single-page extraction from a base64 PDF
//!
//! The page and every object it references (content streams, resources,
//! fonts, annotations) are copied into a new document; nothing is re-rendered.
//! Catalog-level entries of the source (outlines, forms, name trees) are left
//! behind.

use std::collections::{BTreeMap, BTreeSet};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};

use crate::domain::DomainError;

/// Page attributes that may be inherited from the page tree
const INHERITED_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Decode base64 PDF content, tolerating a `data:` URI prefix and line breaks
pub fn decode_pdf(base64_pdf: &str) -> Result<Vec<u8>, DomainError> {
    let payload = match base64_pdf.find(";base64,") {
        Some(pos) if base64_pdf.starts_with("data:") => &base64_pdf[pos + 8..],
        _ => base64_pdf,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    STANDARD
        .decode(cleaned)
        .map_err(|e| DomainError::document(format!("Invalid base64 PDF content: {}", e)))
}

fn load(base64_pdf: &str) -> Result<Document, DomainError> {
    let bytes = decode_pdf(base64_pdf)?;
    Document::load_mem(&bytes)
        .map_err(|e| DomainError::document(format!("Failed to parse PDF: {}", e)))
}

/// Number of pages in a base64 PDF
pub fn page_count(base64_pdf: &str) -> Result<u32, DomainError> {
    Ok(load(base64_pdf)?.get_pages().len() as u32)
}

/// Extract the 1-based `page_number` into a single-page PDF, returned as base64
pub fn extract_page(base64_pdf: &str, page_number: u32) -> Result<String, DomainError> {
    let source = load(base64_pdf)?;
    let pages = source.get_pages();
    let total = pages.len() as u32;

    if page_number < 1 || page_number > total {
        return Err(DomainError::validation(format!(
            "Page number {} is out of range. Must be between 1 and {}",
            page_number, total
        )));
    }

    let Some(&page_id) = pages.get(&page_number) else {
        return Err(DomainError::document(format!("Page {} is missing from the page tree", page_number)));
    };
    let mut document = single_page_document(&source, page_id)?;

    let mut buffer = Vec::new();
    document
        .save_to(&mut buffer)
        .map_err(|e| DomainError::document(format!("Failed to write PDF: {}", e)))?;

    tracing::debug!(
        page_number = page_number,
        total_pages = total,
        size_bytes = buffer.len(),
        "Extracted PDF page"
    );

    Ok(STANDARD.encode(buffer))
}

/// New document holding a copy of `page_id` and everything it references
fn single_page_document(source: &Document, page_id: ObjectId) -> Result<Document, DomainError> {
    let mut page = page_with_inherited_attributes(source, page_id)?;

    let mut copied = BTreeMap::new();
    for value in page.iter().map(|(_, value)| value) {
        collect_references(source, value, page_id, &mut copied);
    }

    let mut document = Document::with_version(source.version.clone());
    document.objects = copied;
    document.max_id = source.max_id;

    let pages_id = document.new_object_id();
    page.set("Parent", pages_id);
    document.objects.insert(page_id, Object::Dictionary(page));
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1i64,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);
    document.renumber_objects();

    Ok(document)
}

/// The page dictionary with inheritable attributes pulled down from its
/// ancestors and its `Parent` link removed
fn page_with_inherited_attributes(
    source: &Document,
    page_id: ObjectId,
) -> Result<Dictionary, DomainError> {
    let mut page = source
        .get_dictionary(page_id)
        .map_err(|e| DomainError::document(format!("Invalid page object: {}", e)))?
        .clone();

    let mut visited = BTreeSet::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    while let Some(parent_id) = parent {
        if !visited.insert(parent_id) {
            break;
        }
        let Ok(node) = source.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITED_KEYS {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key, value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    page.remove(b"Parent");
    Ok(page)
}

fn is_page_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type").and_then(Object::as_name),
            Ok(name) if name == b"Page" || name == b"Pages"
        ),
        _ => false,
    }
}

/// Copy every object reachable from `object`. Other pages and page tree nodes
/// are not followed; references to them dangle and read as null.
fn collect_references(
    source: &Document,
    object: &Object,
    page_id: ObjectId,
    copied: &mut BTreeMap<ObjectId, Object>,
) {
    match object {
        Object::Reference(id) => {
            if *id == page_id || copied.contains_key(id) {
                return;
            }
            let Ok(referenced) = source.get_object(*id) else {
                return;
            };
            if is_page_tree_node(referenced) {
                return;
            }
            copied.insert(*id, referenced.clone());
            collect_references(source, referenced, page_id, copied);
        }
        Object::Array(items) => {
            for item in items {
                collect_references(source, item, page_id, copied);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_references(source, value, page_id, copied);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_references(source, value, page_id, copied);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    /// Base64 PDF with `pages` pages, each showing `Page <n>`
    pub fn pdf_with_pages(pages: u32) -> String {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for n in 1..=pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("Page {}", n))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        STANDARD.encode(buffer)
    }
}
