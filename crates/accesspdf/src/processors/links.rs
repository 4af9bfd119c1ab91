//! Tag link annotations with `Link` elements.
//!
//! Each link annotation gets a `Link` element under the `Document` element
//! holding an `OBJR` reference to it, with the target URI as `/Alt`. The
//! annotation receives a `/StructParent` key whose parent-tree entry points
//! back at the element. Annotations stored inline in `/Annots` are first
//! moved into their own objects so they can be referenced.

use accesspdf_core::{PdfError, ProcessorResult, StructRole};
use accesspdf_parse::{PdfDocument, dict_string};
use lopdf::{Object, ObjectId, dictionary};
use tracing::debug;

use super::Processor;
use crate::config::Config;
use crate::parent_tree::ParentTree;
use crate::struct_tree::StructTree;

/// `/Alt` of a link whose target cannot be determined.
const DEFAULT_LINK_ALT: &str = "Link";

pub struct LinksProcessor;

impl Processor for LinksProcessor {
    fn name(&self) -> &'static str {
        "Links"
    }

    fn process(&self, doc: &mut PdfDocument, _config: &Config) -> Result<ProcessorResult, PdfError> {
        let result = ProcessorResult::new(self.name());
        let Some(tree) = StructTree::find(doc) else {
            return Ok(result);
        };
        if tree.contains_role(doc, &StructRole::Link) {
            return Ok(result);
        }

        let mut parent_tree = ParentTree::read(doc, &tree);
        let mut document = None;
        let mut created = 0;
        for index in 0..doc.page_count() {
            let page = doc.page_id(index)?;
            for annot in page_annotations(doc, index)? {
                if !is_link(doc, annot) {
                    continue;
                }
                let parent = match document {
                    Some(id) => id,
                    None => *document.insert(tree.ensure_document_element(doc)?),
                };
                tag_link(doc, &tree, &mut parent_tree, parent, page, annot)?;
                created += 1;
            }
        }

        if created > 0 {
            parent_tree.write(doc, &tree)?;
            debug!(links = created, "tagged link annotations");
        }
        Ok(result.with_changes(created))
    }
}

fn is_link(doc: &PdfDocument, annot: ObjectId) -> bool {
    doc.dict(annot)
        .ok()
        .and_then(|d| d.get(b"Subtype").and_then(Object::as_name).ok())
        == Some(b"Link".as_slice())
}

/// Annotation ids of a page, moving inline annotation dictionaries into
/// their own objects.
fn page_annotations(doc: &mut PdfDocument, index: usize) -> Result<Vec<ObjectId>, PdfError> {
    let Ok(annots) = doc.page_dict(index)?.get(b"Annots").cloned() else {
        return Ok(Vec::new());
    };
    let (array_id, items) = match annots {
        Object::Reference(id) => match doc.inner().get_object(id) {
            Ok(Object::Array(items)) => (Some(id), items.clone()),
            _ => return Ok(Vec::new()),
        },
        Object::Array(items) => (None, items),
        _ => return Ok(Vec::new()),
    };

    let mut ids = Vec::with_capacity(items.len());
    let mut rewritten = Vec::with_capacity(items.len());
    let mut promoted = false;
    for item in items {
        match item {
            Object::Reference(id) => {
                ids.push(id);
                rewritten.push(Object::Reference(id));
            }
            Object::Dictionary(dict) => {
                let id = doc.add_object(dict);
                ids.push(id);
                rewritten.push(Object::Reference(id));
                promoted = true;
            }
            other => rewritten.push(other),
        }
    }

    if promoted {
        match array_id {
            Some(id) => {
                *doc.inner_mut()
                    .get_object_mut(id)
                    .map_err(|e| PdfError::StructureError(e.to_string()))? = Object::Array(rewritten);
            }
            None => doc.page_dict_mut(index)?.set("Annots", rewritten),
        }
    }
    Ok(ids)
}

/// The annotation's URI action target, if any.
pub fn link_uri(doc: &PdfDocument, annot: ObjectId) -> Option<String> {
    let dict = doc.dict(annot).ok()?;
    let action = doc.resolve_dict(dict.get(b"A").ok()?)?;
    dict_string(doc.inner(), action, b"URI").filter(|uri| !uri.trim().is_empty())
}

fn tag_link(
    doc: &mut PdfDocument,
    tree: &StructTree,
    parent_tree: &mut ParentTree,
    parent: ObjectId,
    page: ObjectId,
    annot: ObjectId,
) -> Result<ObjectId, PdfError> {
    let alt = link_uri(doc, annot).unwrap_or_else(|| DEFAULT_LINK_ALT.to_string());
    let link = tree.create_element(doc, &StructRole::Link, parent, Some(page))?;
    StructTree::set_alt_text(doc, link, &alt)?;
    StructTree::append_kid(
        doc,
        link,
        Object::Dictionary(dictionary! {
            "Type" => "OBJR",
            "Obj" => annot,
            "Pg" => page,
        }),
    )?;

    let existing_key = doc
        .dict(annot)?
        .get(b"StructParent")
        .and_then(Object::as_i64)
        .ok();
    let key = match existing_key {
        Some(key) if !parent_tree.contains_key(key) => key,
        _ => parent_tree.next_key(),
    };
    parent_tree.set_direct(key, link);
    doc.dict_mut(annot)?.set("StructParent", key);
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parent_tree::ParentTreeEntry;
    use crate::processors::TaggerProcessor;
    use crate::struct_tree::{Kid, StructElement};
    use crate::test_support::text_pdf;

    fn uri_annot(uri: &str) -> lopdf::Dictionary {
        dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![72.into(), 700.into(), 200.into(), 712.into()],
            "A" => dictionary! {
                "S" => "URI",
                "URI" => Object::string_literal(uri),
            },
        }
    }

    fn linked_doc() -> (PdfDocument, ObjectId) {
        let mut doc = text_pdf(&[b"BT /F1 12 Tf 72 700 Td (Visit us) Tj ET"]);
        let referenced = doc.add_object(uri_annot("https://example.com"));
        let widget = doc.add_object(dictionary! { "Type" => "Annot", "Subtype" => "Widget" });
        let bare_link = dictionary! { "Type" => "Annot", "Subtype" => "Link" };
        doc.page_dict_mut(0).unwrap().set(
            "Annots",
            vec![
                Object::Reference(referenced),
                Object::Reference(widget),
                Object::Dictionary(bare_link),
            ],
        );
        TaggerProcessor.process(&mut doc, &Config::default()).unwrap();
        (doc, referenced)
    }

    fn links(doc: &PdfDocument) -> Vec<StructElement> {
        StructTree::find(doc)
            .unwrap()
            .elements(doc)
            .into_iter()
            .filter(|e| e.role == StructRole::Link)
            .collect()
    }

    #[test]
    fn link_annotations_get_link_elements() {
        let (mut doc, referenced) = linked_doc();
        let result = LinksProcessor.process(&mut doc, &Config::default()).unwrap();
        assert_eq!(result.changes_made, 2);

        let links = links(&doc);
        assert_eq!(links[0].alt_text.as_deref(), Some("https://example.com"));
        assert_eq!(links[1].alt_text.as_deref(), Some("Link"));
        let page = doc.page_id(0).unwrap();
        assert_eq!(
            links[0].kids,
            vec![Kid::ObjectRef { obj: referenced, page: Some(page) }]
        );

        let key = doc
            .dict(referenced)
            .unwrap()
            .get(b"StructParent")
            .unwrap()
            .as_i64()
            .unwrap();
        let tree = StructTree::find(&doc).unwrap();
        let parent_tree = ParentTree::read(&doc, &tree);
        assert_eq!(parent_tree.get(key), Some(&ParentTreeEntry::Direct(links[0].id)));
        // The page's own slot array is untouched.
        assert!(matches!(parent_tree.get(0), Some(ParentTreeEntry::Slots(_))));
    }

    #[test]
    fn inline_annotations_are_promoted() {
        let (mut doc, _) = linked_doc();
        LinksProcessor.process(&mut doc, &Config::default()).unwrap();
        let annots = doc.page_dict(0).unwrap().get(b"Annots").unwrap().as_array().unwrap();
        assert!(annots.iter().all(|a| a.as_reference().is_ok()));
        let Kid::ObjectRef { obj, .. } = &links(&doc)[1].kids[0] else {
            panic!("expected OBJR kid");
        };
        assert!(doc.dict(*obj).unwrap().has(b"StructParent"));
    }

    #[test]
    fn second_run_is_skipped() {
        let (mut doc, _) = linked_doc();
        LinksProcessor.process(&mut doc, &Config::default()).unwrap();
        let again = LinksProcessor.process(&mut doc, &Config::default()).unwrap();
        assert_eq!(again.changes_made, 0);
        assert_eq!(links(&doc).len(), 2);
    }

    #[test]
    fn untagged_document_is_left_alone() {
        let mut doc = text_pdf(&[b""]);
        let annot = doc.add_object(uri_annot("https://example.com"));
        doc.page_dict_mut(0)
            .unwrap()
            .set("Annots", vec![Object::Reference(annot)]);
        let result = LinksProcessor.process(&mut doc, &Config::default()).unwrap();
        assert_eq!(result.changes_made, 0);
        assert!(!doc.dict(annot).unwrap().has(b"StructParent"));
    }
}
