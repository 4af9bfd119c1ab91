//! Per-page cache of the text shown inside each marked-content region.

use std::collections::{BTreeMap, HashMap};

use accesspdf_parse::PdfDocument;
use accesspdf_parse::replay::mcid_texts;
use tracing::debug;

use crate::struct_tree::{Kid, StructElement};

/// Lazily replays pages and remembers the MCID → text map of each.
#[derive(Debug, Default)]
pub struct McidTextCache {
    pages: HashMap<usize, BTreeMap<u32, String>>,
}

impl McidTextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// MCID texts of a page; empty when the content cannot be parsed.
    pub fn page_texts(&mut self, doc: &PdfDocument, index: usize) -> &BTreeMap<u32, String> {
        self.pages.entry(index).or_insert_with(|| {
            match doc.page_operators(index) {
                Ok(ops) => mcid_texts(&ops),
                Err(e) => {
                    debug!(page = index, error = %e, "no MCID text for unparsable page");
                    BTreeMap::new()
                }
            }
        })
    }

    /// Text of an element's own marked content, joined with spaces.
    pub fn element_text(&mut self, doc: &PdfDocument, element: &StructElement) -> String {
        let mut parts = Vec::new();
        for (mcid, page) in element.mcids() {
            let Some(index) = page.and_then(|p| doc.page_index(p)) else {
                continue;
            };
            if let Some(text) = self.page_texts(doc, index).get(&mcid) {
                if !text.is_empty() {
                    parts.push(text.clone());
                }
            }
        }
        parts.join(" ")
    }

    /// Text of an element including the marked content of its descendants.
    pub fn subtree_text(&mut self, doc: &PdfDocument, element: &StructElement) -> String {
        let mut parts = Vec::new();
        let own = self.element_text(doc, element);
        if !own.is_empty() {
            parts.push(own);
        }
        for kid in &element.kids {
            if let Kid::Element(id) = kid {
                if *id == element.id {
                    continue;
                }
                if let Ok(child) = StructElement::load(doc, *id) {
                    let text = self.element_text(doc, &child);
                    if !text.is_empty() {
                        parts.push(text);
                    }
                }
            }
        }
        parts.join(" ")
    }

    /// Drop cached pages, e.g. after a content stream was rewritten.
    pub fn invalidate(&mut self, index: usize) {
        self.pages.remove(&index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::struct_tree::StructTree;
    use crate::test_support::text_pdf;
    use accesspdf_core::StructRole;
    use lopdf::Object;

    #[test]
    fn element_text_reads_its_mcids() {
        let mut doc = text_pdf(&[
            b"/P <</MCID 0>> BDC BT /F1 12 Tf 72 700 Td (Intro) Tj ET EMC \
              /P <</MCID 1>> BDC BT /F1 12 Tf 72 680 Td (Body text) Tj ET EMC",
        ]);
        let page = doc.page_id(0).unwrap();
        let tree = StructTree::ensure(&mut doc).unwrap();
        let document = tree.ensure_document_element(&mut doc).unwrap();
        let p = tree
            .create_element(&mut doc, &StructRole::P, document, Some(page))
            .unwrap();
        StructTree::append_kid(&mut doc, p, Object::Integer(1)).unwrap();

        let mut cache = McidTextCache::new();
        let element = StructElement::load(&doc, p).unwrap();
        assert_eq!(cache.element_text(&doc, &element), "Body text");
        assert_eq!(cache.page_texts(&doc, 0).len(), 2);
    }

    #[test]
    fn unparsable_page_yields_no_text() {
        let doc = text_pdf(&[b"BT (unterminated"]);
        let mut cache = McidTextCache::new();
        assert!(cache.page_texts(&doc, 0).is_empty());
    }
}
