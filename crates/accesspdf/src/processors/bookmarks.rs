//! Build the document outline from the heading elements.
//!
//! Headings are nested with [`build_outline`] and written as a fresh
//! `/Outlines` tree, replacing any previous outline. When the existing
//! outline already matches the headings nothing is written.

use std::collections::HashSet;

use accesspdf_core::{
    Bookmark, HeadingEntry, OutlineNode, PdfError, ProcessorResult, build_outline, flatten_outline,
};
use accesspdf_parse::{PdfDocument, dict_string, encode_text_string};
use lopdf::{Dictionary, Object, ObjectId, dictionary};
use tracing::debug;

use super::Processor;
use crate::config::Config;
use crate::mcid_text::McidTextCache;
use crate::struct_tree::StructTree;

/// Outline items deeper than this are not read.
const MAX_OUTLINE_DEPTH: usize = 32;

pub struct BookmarksProcessor;

impl Processor for BookmarksProcessor {
    fn name(&self) -> &'static str {
        "Bookmarks"
    }

    fn process(&self, doc: &mut PdfDocument, _config: &Config) -> Result<ProcessorResult, PdfError> {
        let result = ProcessorResult::new(self.name());
        let Some(tree) = StructTree::find(doc) else {
            return Ok(result);
        };
        let headings = collect_headings(doc, &tree);
        if headings.is_empty() {
            return Ok(result);
        }

        let outline = build_outline(&headings);
        let (existing, existing_ids) = read_outline(doc);
        if existing == flatten_outline(&outline) {
            return Ok(result);
        }

        for id in existing_ids {
            doc.inner_mut().objects.remove(&id);
        }
        let root = write_outline(doc, &outline)?;
        doc.catalog_mut()?.set("Outlines", root);
        debug!(headings = headings.len(), "rebuilt outline");
        Ok(result.with_changes(headings.len()))
    }
}

/// `H1`..`H6` elements in document order with their text and page.
/// Headings without text are left out.
pub fn collect_headings(doc: &PdfDocument, tree: &StructTree) -> Vec<HeadingEntry> {
    let mut cache = McidTextCache::new();
    tree.elements(doc)
        .into_iter()
        .filter_map(|element| {
            let level = element.role.heading_level()?;
            let text = cache.element_text(doc, &element);
            if text.is_empty() {
                return None;
            }
            let page_index = element
                .owning_page(doc)
                .and_then(|p| doc.page_index(p))
                .unwrap_or(0);
            Some(HeadingEntry {
                level,
                text,
                page_index,
            })
        })
        .collect()
}

/// The current outline flattened, plus the ids of its root and items.
pub fn read_outline(doc: &PdfDocument) -> (Vec<Bookmark>, Vec<ObjectId>) {
    let mut bookmarks = Vec::new();
    let mut ids = Vec::new();
    let Some(root_id) = doc
        .catalog()
        .ok()
        .and_then(|c| c.get(b"Outlines").and_then(Object::as_reference).ok())
    else {
        return (bookmarks, ids);
    };
    ids.push(root_id);
    let mut visited = HashSet::from([root_id]);
    if let Some(first) = doc.dict(root_id).ok().and_then(|d| child_ref(d, b"First")) {
        read_items(doc, first, 0, &mut visited, &mut bookmarks, &mut ids);
    }
    (bookmarks, ids)
}

fn child_ref(dict: &Dictionary, key: &[u8]) -> Option<ObjectId> {
    dict.get(key).and_then(Object::as_reference).ok()
}

fn read_items(
    doc: &PdfDocument,
    first: ObjectId,
    level: usize,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<Bookmark>,
    ids: &mut Vec<ObjectId>,
) {
    if level >= MAX_OUTLINE_DEPTH {
        return;
    }
    let mut next = Some(first);
    while let Some(id) = next {
        if !visited.insert(id) {
            return;
        }
        let Ok(item) = doc.dict(id) else {
            return;
        };
        ids.push(id);
        out.push(Bookmark {
            title: dict_string(doc.inner(), item, b"Title").unwrap_or_default(),
            level,
            page_number: destination_page(doc, item),
        });
        if let Some(child) = child_ref(item, b"First") {
            read_items(doc, child, level + 1, visited, out, ids);
        }
        next = child_ref(item, b"Next");
    }
}

/// Page index of an item's explicit `/Dest` or `GoTo` action target.
fn destination_page(doc: &PdfDocument, item: &Dictionary) -> Option<usize> {
    let dest = match item.get(b"Dest") {
        Ok(dest) => doc.resolve(dest),
        Err(_) => {
            let action = doc.resolve_dict(item.get(b"A").ok()?)?;
            doc.resolve(action.get(b"D").ok()?)
        }
    };
    let Object::Array(parts) = dest else {
        return None;
    };
    doc.page_index(parts.first()?.as_reference().ok()?)
}

fn write_outline(doc: &mut PdfDocument, outline: &[OutlineNode]) -> Result<ObjectId, PdfError> {
    let root_id = doc.inner_mut().new_object_id();
    let mut root = dictionary! { "Type" => "Outlines" };
    if let Some((first, last)) = write_items(doc, outline, root_id)? {
        root.set("First", first);
        root.set("Last", last);
        let visible: usize = outline.iter().map(|n| 1 + n.descendant_count()).sum();
        root.set("Count", visible as i64);
    }
    doc.inner_mut()
        .objects
        .insert(root_id, Object::Dictionary(root));
    Ok(root_id)
}

/// Write sibling items under `parent`, returning the first and last ids.
fn write_items(
    doc: &mut PdfDocument,
    nodes: &[OutlineNode],
    parent: ObjectId,
) -> Result<Option<(ObjectId, ObjectId)>, PdfError> {
    let ids: Vec<ObjectId> = nodes.iter().map(|_| doc.inner_mut().new_object_id()).collect();
    for (i, node) in nodes.iter().enumerate() {
        let page = doc.page_id(node.page_index)?;
        let mut item = dictionary! {
            "Title" => encode_text_string(&node.title),
            "Parent" => parent,
            "Dest" => vec![Object::Reference(page), Object::Name(b"Fit".to_vec())],
        };
        if i > 0 {
            item.set("Prev", ids[i - 1]);
        }
        if let Some(next) = ids.get(i + 1) {
            item.set("Next", *next);
        }
        if let Some((first, last)) = write_items(doc, &node.children, ids[i])? {
            item.set("First", first);
            item.set("Last", last);
            item.set("Count", node.descendant_count() as i64);
        }
        doc.inner_mut()
            .objects
            .insert(ids[i], Object::Dictionary(item));
    }
    Ok(ids.first().copied().zip(ids.last().copied()))
}
